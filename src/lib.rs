//! pneumo-report: chest X-ray pneumonia classification with PDF reports.
//!
//! A pre-trained ONNX classifier labels an uploaded X-ray as NORMAL or
//! PNEUMONIA, and the result is combined with patient details into a
//! downloadable PDF. The HTTP shell in [`handlers`] only collects inputs and
//! forwards them to [`inference`] and [`report`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod report;
