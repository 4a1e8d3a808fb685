//! Error taxonomy for the classification and report pipeline.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Startup-only failure. Without a model nothing can be served.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file not found: {0}")]
    NotFound(String),

    #[error("failed to parse model: {0}")]
    Parse(String),

    #[error("failed to prepare model for inference: {0}")]
    Optimize(String),
}

/// The uploaded bytes could not be turned into a model input.
#[derive(Debug, Error)]
pub enum InvalidImageError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("image has no pixels")]
    Empty,

    #[error("invalid model input size {width}x{height}")]
    InputSize { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("forward pass failed: {0}")]
    Run(String),

    #[error("expected {expected} class probabilities, model produced {actual}")]
    OutputShape { expected: usize, actual: usize },

    #[error("class probability {value} at index {index} is outside [0, 1]")]
    OutOfRange { index: usize, value: f32 },
}

/// Everything `InferenceEngine::classify` can fail with.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Debug, Error)]
pub enum ReportRenderError {
    #[error("failed to build PDF: {0}")]
    Pdf(String),

    #[error("character {ch:?} cannot be printed in the report font (in \"{line}\")")]
    UnsupportedCharacter { ch: char, line: String },

    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::InvalidImage(e) => ApiError::InvalidImage(e),
            ClassifyError::Inference(e) => ApiError::Inference(e),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
