//! Chest X-ray classification.
//!
//! - [`preprocess`]: image bytes → NHWC float tensor
//! - [`classifier`]: the `Classifier` seam and its tract ONNX implementation
//! - [`engine`]: argmax interpretation and the `InferenceEngine` front-end

pub mod classifier;
pub mod engine;
pub mod preprocess;

pub use classifier::{Classifier, OnnxClassifier};
pub use engine::{argmax, interpret, InferenceEngine};
pub use preprocess::{decode_image, preprocess, preprocess_image};
