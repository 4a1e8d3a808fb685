//! The model seam: anything that maps an input tensor to class probabilities.

use ndarray::Array4;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{InferenceError, ModelLoadError};

/// A loaded, read-only classifier. Implementations must be safe to share
/// between concurrent requests.
pub trait Classifier: Send + Sync {
    /// Run one forward pass and return the flattened probability vector.
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX classifier executed with tract.
pub struct OnnxClassifier {
    plan: OnnxPlan,
}

impl OnnxClassifier {
    /// Parse, optimise and prepare the model once. Every failure here is fatal.
    pub fn load(config: &ModelConfig) -> Result<Self, ModelLoadError> {
        let path = &config.path;
        if !path.is_file() {
            return Err(ModelLoadError::NotFound(path.display().to_string()));
        }

        let shape = config.input.shape();
        info!(model = %path.display(), ?shape, "Loading ONNX model");

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?
            .with_input_fact(0, f32::fact(shape).into())
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?
            .into_optimized()
            .map_err(|e| ModelLoadError::Optimize(e.to_string()))?
            .into_runnable()
            .map_err(|e| ModelLoadError::Optimize(e.to_string()))?;

        info!("Model ready");
        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape = input.shape().to_vec();
        let values: Vec<f32> = input.iter().copied().collect();
        let tensor = tract_ndarray::Array::from_shape_vec(shape, values)
            .map_err(|e| InferenceError::Run(e.to_string()))?
            .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::Run("model produced no outputs".to_string()))?;
        let probabilities: Vec<f32> = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Run(e.to_string()))?
            .iter()
            .copied()
            .collect();

        debug!(?probabilities, "Forward pass complete");
        Ok(probabilities)
    }
}
