//! Classification report generation.
//!
//! - [`layout`]: the report's sections as ordered text lines
//! - [`pdf`]: rendering those lines into PDF bytes

pub mod layout;
pub mod pdf;

pub use layout::{recommendations, ReportDocument, ReportLine};
pub use pdf::render_pdf;

use crate::config::ReportConfig;
use crate::error::ReportRenderError;
use crate::models::{ClassificationResult, PatientRecord};

/// Lay out and render the full report. Returns complete PDF bytes or an error.
pub fn generate_report(
    patient: &PatientRecord,
    result: &ClassificationResult,
    config: &ReportConfig,
) -> Result<Vec<u8>, ReportRenderError> {
    let document = ReportDocument::build(patient, result);
    render_pdf(&document, config)
}
