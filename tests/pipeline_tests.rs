//! End-to-end tests for classify → report with an injected classifier.

use std::io::Cursor;

use chrono::NaiveDate;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use ndarray::Array4;

use pneumo_report::config::{InputSpec, ReportConfig};
use pneumo_report::error::{ClassifyError, InferenceError};
use pneumo_report::inference::{Classifier, InferenceEngine};
use pneumo_report::models::{Label, PatientRecord, Sex};
use pneumo_report::report::{generate_report, ReportDocument};

/// Returns the same probabilities for every input and checks the input shape.
struct FixedClassifier {
    probabilities: Vec<f32>,
}

impl Classifier for FixedClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        assert_eq!(input.shape(), &[1, 128, 128, 3]);
        Ok(self.probabilities.clone())
    }
}

fn engine(probabilities: &[f32]) -> InferenceEngine {
    InferenceEngine::new(
        Box::new(FixedClassifier {
            probabilities: probabilities.to_vec(),
        }),
        InputSpec::default(),
    )
}

fn xray_png() -> Vec<u8> {
    let img = RgbImage::from_fn(640, 480, |x, y| {
        let v = ((x + y) % 256) as u8;
        Rgb([v, v, v])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

fn jane() -> PatientRecord {
    PatientRecord {
        name: "Jane Doe".to_string(),
        age: "34".to_string(),
        sex: Sex::Female,
        address: "1 Elm St".to_string(),
        diagnosis_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
    }
}

#[test]
fn test_pneumonia_end_to_end() {
    let result = engine(&[0.1, 0.9]).classify(&xray_png()).unwrap();
    assert_eq!(result.label, Label::Pneumonia);
    assert_eq!(result.confidence, 0.9);

    let text = ReportDocument::build(&jane(), &result).to_text();
    let lines: Vec<&str> = text.lines().collect();
    let idx = lines
        .iter()
        .position(|l| *l == "Classification Result")
        .unwrap();
    assert_eq!(lines[idx + 1], "Prediction: PNEUMONIA");
    assert_eq!(lines[idx + 2], "Confidence: 90.00%");
}

#[test]
fn test_normal_end_to_end_patient_section() {
    let result = engine(&[0.8, 0.2]).classify(&xray_png()).unwrap();
    assert_eq!(result.label, Label::Normal);

    let text = ReportDocument::build(&jane(), &result).to_text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Patient Information");
    assert_eq!(lines[5], "Diagnosis Date: 2024-01-15");
    assert!(text.contains("This X-ray image is classified as Normal."));
    assert!(!text.contains("- Seek medical attention immediately"));
}

#[test]
fn test_tie_resolves_to_normal() {
    let result = engine(&[0.5, 0.5]).classify(&xray_png()).unwrap();
    assert_eq!(result.label, Label::Normal);
    assert_eq!(result.confidence, 0.5);
}

#[test]
fn test_corrupt_image_never_reaches_model() {
    struct PanickingClassifier;
    impl Classifier for PanickingClassifier {
        fn predict(&self, _: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            panic!("model must not run for undecodable input");
        }
    }

    let engine = InferenceEngine::new(Box::new(PanickingClassifier), InputSpec::default());
    let mut truncated = xray_png();
    truncated.truncate(40);
    let err = engine.classify(&truncated).unwrap_err();
    assert!(matches!(err, ClassifyError::InvalidImage(_)));
}

#[test]
fn test_bad_model_output_is_surfaced() {
    let err = engine(&[0.3, 0.3, 0.4]).classify(&xray_png()).unwrap_err();
    assert!(matches!(
        err,
        ClassifyError::Inference(InferenceError::OutputShape { .. })
    ));
}

#[test]
fn test_engine_is_stateless_across_calls() {
    let engine = engine(&[0.25, 0.75]);
    let first = engine.classify(&xray_png()).unwrap();
    let second = engine.classify(&xray_png()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_generate_report_produces_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let config = ReportConfig {
        temp_dir: Some(dir.path().to_path_buf()),
    };
    let result = engine(&[0.1, 0.9]).classify(&xray_png()).unwrap();

    let bytes = generate_report(&jane(), &result, &config).unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    // The temporary artifact is gone once the bytes are returned.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_report_render_failure_is_error() {
    let config = ReportConfig {
        temp_dir: Some("/nonexistent/report-dir".into()),
    };
    let result = engine(&[0.1, 0.9]).classify(&xray_png()).unwrap();
    assert!(generate_report(&jane(), &result, &config).is_err());
}

#[test]
fn test_long_address_still_renders() {
    let mut patient = jane();
    patient.address = "Apartment 12, ".repeat(40);
    let result = engine(&[0.1, 0.9]).classify(&xray_png()).unwrap();
    let bytes = generate_report(&patient, &result, &ReportConfig::default()).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
