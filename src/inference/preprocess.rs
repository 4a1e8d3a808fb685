//! Image decoding and tensor preparation.
//!
//! Decode → RGB8 → exact resize → channel reorder → scale to [0, 1] →
//! leading batch axis. The output layout is NHWC.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

use crate::config::{ChannelOrder, InputSpec};
use crate::error::InvalidImageError;

/// Decode JPEG/PNG (or any format `image` recognises) from memory.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, InvalidImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| InvalidImageError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(InvalidImageError::Empty);
    }
    Ok(img)
}

/// Decode raw upload bytes into the model input tensor.
pub fn preprocess(bytes: &[u8], spec: &InputSpec) -> Result<Array4<f32>, InvalidImageError> {
    let img = decode_image(bytes)?;
    preprocess_image(&img, spec)
}

/// Turn an already-decoded image into a `(1, height, width, 3)` tensor.
pub fn preprocess_image(
    img: &DynamicImage,
    spec: &InputSpec,
) -> Result<Array4<f32>, InvalidImageError> {
    if spec.width == 0 || spec.height == 0 {
        return Err(InvalidImageError::InputSize {
            width: spec.width,
            height: spec.height,
        });
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(InvalidImageError::Empty);
    }

    let rgb = img.to_rgb8();
    let resized: RgbImage = if rgb.dimensions() == (spec.width, spec.height) {
        rgb
    } else {
        imageops::resize(&rgb, spec.width, spec.height, FilterType::Triangle)
    };

    let channel_map: [usize; 3] = match spec.channel_order {
        ChannelOrder::Rgb => [0, 1, 2],
        ChannelOrder::Bgr => [2, 1, 0],
    };

    let shape = spec.shape();
    let tensor = Array4::from_shape_fn((shape[0], shape[1], shape[2], shape[3]), |(_, y, x, c)| {
        let pixel = resized.get_pixel(x as u32, y as u32);
        pixel[channel_map[c]] as f32 / 255.0
    });

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Cursor;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_output_shape_and_range() {
        let img = RgbImage::from_fn(300, 200, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
        let tensor = preprocess(&encode_png(&img), &InputSpec::default()).unwrap();
        assert_eq!(tensor.shape(), &[1, 128, 128, 3]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_bgr_reorders_channels() {
        let img = RgbImage::from_pixel(128, 128, Rgb([255, 0, 51]));
        let tensor = preprocess(&encode_png(&img), &InputSpec::default()).unwrap();
        assert!((tensor[[0, 5, 5, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 5, 5, 1]], 0.0);
        assert_eq!(tensor[[0, 5, 5, 2]], 1.0);
    }

    #[test]
    fn test_rgb_keeps_channels() {
        let spec = InputSpec {
            width: 16,
            height: 8,
            channel_order: ChannelOrder::Rgb,
        };
        let img = RgbImage::from_pixel(32, 32, Rgb([255, 0, 51]));
        let tensor = preprocess(&encode_png(&img), &spec).unwrap();
        assert_eq!(tensor.shape(), &[1, 8, 16, 3]);
        assert!(tensor[[0, 0, 0, 0]] > 0.99);
        assert!(tensor[[0, 0, 0, 1]] < 0.01);
    }

    #[test]
    fn test_grayscale_input_is_expanded() {
        let gray = image::GrayImage::from_pixel(128, 128, image::Luma([255]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        let tensor = preprocess(&buf, &InputSpec::default()).unwrap();
        assert!(tensor.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = preprocess(b"definitely not an image", &InputSpec::default()).unwrap_err();
        assert!(matches!(err, InvalidImageError::Decode(_)));
    }

    #[test]
    fn test_zero_input_size_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let spec = InputSpec {
            width: 0,
            ..InputSpec::default()
        };
        assert!(matches!(
            preprocess_image(&img, &spec),
            Err(InvalidImageError::InputSize { .. })
        ));
    }
}
