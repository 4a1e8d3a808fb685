use tracing::debug;

use crate::config::InputSpec;
use crate::error::{ClassifyError, InferenceError};
use crate::models::{ClassificationResult, Label};

use super::classifier::Classifier;
use super::preprocess::preprocess;

/// Index of the first maximum. Equal values resolve to the lower index;
/// `None` for an empty slice or when a NaN is present.
pub fn argmax(values: &[f32]) -> Option<usize> {
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Map a raw probability vector to a label and confidence.
pub fn interpret(probabilities: &[f32]) -> Result<ClassificationResult, InferenceError> {
    if probabilities.len() != Label::ALL.len() {
        return Err(InferenceError::OutputShape {
            expected: Label::ALL.len(),
            actual: probabilities.len(),
        });
    }
    if let Some((index, &value)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
        return Err(InferenceError::OutOfRange { index, value });
    }

    // Non-empty and NaN-free at this point.
    let index = argmax(probabilities).ok_or(InferenceError::OutputShape {
        expected: Label::ALL.len(),
        actual: 0,
    })?;
    let label = Label::from_index(index).ok_or(InferenceError::OutputShape {
        expected: Label::ALL.len(),
        actual: probabilities.len(),
    })?;

    Ok(ClassificationResult {
        label,
        confidence: probabilities[index],
    })
}

/// Stateless classification front-end over an injected model.
pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    input: InputSpec,
}

impl InferenceEngine {
    pub fn new(classifier: Box<dyn Classifier>, input: InputSpec) -> Self {
        Self { classifier, input }
    }

    pub fn input_spec(&self) -> &InputSpec {
        &self.input
    }

    /// Decode, preprocess and classify one uploaded image.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<ClassificationResult, ClassifyError> {
        let tensor = preprocess(image_bytes, &self.input)?;
        let probabilities = self.classifier.predict(&tensor)?;
        let result = interpret(&probabilities)?;
        debug!(
            label = %result.label,
            confidence = result.confidence,
            "Image classified"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_maximum() {
        assert_eq!(argmax(&[0.1, 0.9]), Some(1));
        assert_eq!(argmax(&[0.7, 0.3]), Some(0));
    }

    #[test]
    fn test_argmax_tie_prefers_lower_index() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
    }

    #[test]
    fn test_argmax_degenerate_inputs() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.3, f32::NAN]), None);
    }

    #[test]
    fn test_interpret_pneumonia() {
        let result = interpret(&[0.1, 0.9]).unwrap();
        assert_eq!(result.label, Label::Pneumonia);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_interpret_tie_is_normal() {
        let result = interpret(&[0.5, 0.5]).unwrap();
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_interpret_rejects_wrong_length() {
        assert!(matches!(
            interpret(&[1.0]),
            Err(InferenceError::OutputShape { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            interpret(&[0.2, 0.3, 0.5]),
            Err(InferenceError::OutputShape { actual: 3, .. })
        ));
    }

    #[test]
    fn test_interpret_rejects_out_of_range() {
        assert!(matches!(
            interpret(&[-0.1, 1.1]),
            Err(InferenceError::OutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            interpret(&[0.2, f32::NAN]),
            Err(InferenceError::OutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_confidence_is_max_entry() {
        for p in [[0.0, 1.0], [1.0, 0.0], [0.49, 0.51], [0.8, 0.2]] {
            let result = interpret(&p).unwrap();
            let max = p.iter().cloned().fold(f32::MIN, f32::max);
            assert_eq!(result.confidence, max);
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }
}
