use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Predicted class. Index order matches the classifier's output vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Normal,
    Pneumonia,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Normal, Label::Pneumonia];

    pub fn from_index(index: usize) -> Option<Label> {
        Self::ALL.get(index).copied()
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Normal => write!(f, "NORMAL"),
            Label::Pneumonia => write!(f, "PNEUMONIA"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Probability mass at the predicted index, in `[0, 1]`.
    pub confidence: f32,
}

impl ClassificationResult {
    /// Confidence as a percentage with two decimals, e.g. `90.00%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl std::str::FromStr for Sex {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            "other" => Ok(Sex::Other),
            _ => Err(format!("Unknown sex: {s}. Use 'Male', 'Female' or 'Other'.")),
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
            Sex::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub name: String,
    pub age: String,
    pub sex: Sex,
    pub address: String,
    pub diagnosis_date: NaiveDate,
}

impl PatientRecord {
    /// Download name for this patient's report.
    ///
    /// Characters that would break a path or a `Content-Disposition` header
    /// are replaced with `_`.
    pub fn report_filename(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| match c {
                '/' | '\\' | '"' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        format!("{name}_classification_report.pdf")
    }
}
