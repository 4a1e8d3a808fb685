//! Report content as an ordered list of lines.
//!
//! The layout is a pure function of the patient and the classification, so
//! two calls with the same inputs produce the same text. Rendering to PDF
//! happens separately in [`super::pdf`].

use serde::Serialize;

use crate::models::{ClassificationResult, Label, PatientRecord};

pub const PATIENT_HEADING: &str = "Patient Information";
pub const RESULT_HEADING: &str = "Classification Result";
pub const RECOMMENDATIONS_HEADING: &str = "Recommendations";

pub const PNEUMONIA_ADVISORY: &str = "This X-ray image is classified as Pneumonia. \
Please consult a healthcare professional for further evaluation and treatment.";
pub const PNEUMONIA_STEPS_INTRO: &str =
    "Based on the diagnosis, here are some initial steps the patient may take:";
pub const PNEUMONIA_STEPS: [&str; 5] = [
    "Seek medical attention immediately",
    "Follow the prescribed treatment plan",
    "Get plenty of rest",
    "Stay hydrated",
    "Avoid close contact with others to prevent spreading the infection",
];
pub const NORMAL_STATEMENT: &str = "This X-ray image is classified as Normal.";
pub const CLOSING_MESSAGE: &str =
    "Please consult a healthcare professional for further evaluation and treatment if necessary.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum ReportLine {
    Heading(String),
    Body(String),
    Spacer,
}

impl ReportLine {
    pub fn text(&self) -> &str {
        match self {
            ReportLine::Heading(text) | ReportLine::Body(text) => text,
            ReportLine::Spacer => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    lines: Vec<ReportLine>,
}

impl ReportDocument {
    pub fn build(patient: &PatientRecord, result: &ClassificationResult) -> Self {
        let mut lines = Vec::with_capacity(24);

        lines.push(ReportLine::Heading(PATIENT_HEADING.to_string()));
        lines.push(ReportLine::Body(format!("Name: {}", patient.name)));
        lines.push(ReportLine::Body(format!("Age: {}", patient.age)));
        lines.push(ReportLine::Body(format!("Sex: {}", patient.sex)));
        lines.push(ReportLine::Body(format!("Address: {}", patient.address)));
        lines.push(ReportLine::Body(format!(
            "Diagnosis Date: {}",
            patient.diagnosis_date.format("%Y-%m-%d")
        )));
        lines.push(ReportLine::Spacer);

        lines.push(ReportLine::Heading(RESULT_HEADING.to_string()));
        lines.push(ReportLine::Body(format!("Prediction: {}", result.label)));
        lines.push(ReportLine::Body(format!(
            "Confidence: {}",
            result.confidence_percent()
        )));
        lines.push(ReportLine::Spacer);

        lines.push(ReportLine::Heading(RECOMMENDATIONS_HEADING.to_string()));
        lines.extend(
            recommendations(result.label)
                .into_iter()
                .map(ReportLine::Body),
        );
        lines.push(ReportLine::Spacer);

        lines.push(ReportLine::Body(CLOSING_MESSAGE.to_string()));

        Self { lines }
    }

    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    /// Body lines between the Recommendations heading and the next spacer.
    pub fn recommendations(&self) -> Vec<&str> {
        self.lines
            .iter()
            .skip_while(|line| **line != ReportLine::Heading(RECOMMENDATIONS_HEADING.to_string()))
            .skip(1)
            .take_while(|line| **line != ReportLine::Spacer)
            .map(ReportLine::text)
            .collect()
    }

    /// Plain-text rendering, one entry per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.text());
            out.push('\n');
        }
        out
    }
}

/// Recommendation lines for a label, bullets included.
pub fn recommendations(label: Label) -> Vec<String> {
    match label {
        Label::Pneumonia => {
            let mut lines = vec![
                PNEUMONIA_ADVISORY.to_string(),
                PNEUMONIA_STEPS_INTRO.to_string(),
            ];
            lines.extend(PNEUMONIA_STEPS.iter().map(|step| format!("- {step}")));
            lines
        }
        Label::Normal => vec![NORMAL_STATEMENT.to_string()],
    }
}
