use std::path::Path;
use std::sync::Arc;

use ndarray::Array4;
use tract_onnx::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model error: {0}")]
    Model(String),
    #[error("Malformed model output: {0}")]
    Output(String),
}

/// The classifier collaborator. Input is a `(1, 224, 224, 3)` batch of
/// [0,1]-scaled RGB values; output is the per-class probability vector.
pub trait SpiralClassifier: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

type OnnxModel = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

pub struct OnnxClassifier {
    model: OnnxModel,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InferenceError::Model(format!(
                "model file not found at {}",
                path.display()
            )));
        }

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::Model(e.to_string()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 224, 224, 3)),
            )
            .map_err(|e| InferenceError::Model(e.to_string()))?
            .into_optimized()
            .map_err(|e| InferenceError::Model(e.to_string()))?
            .into_runnable()
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        Ok(Self { model })
    }
}

impl SpiralClassifier for OnnxClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let values: Vec<f32> = input.iter().copied().collect();
        let tensor = tract_ndarray::Array::from_shape_vec((1, 224, 224, 3), values)
            .map_err(|e| InferenceError::Model(e.to_string()))?
            .into_tensor();

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let probs = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Output(e.to_string()))?;
        Ok(probs.iter().copied().collect())
    }
}

/// Process-lifetime handle to the classifier. Loaded once at startup and
/// shared read-only across workers; when loading failed the handle stays
/// empty and classification requests are refused.
#[derive(Clone, Default)]
pub struct ModelState {
    classifier: Option<Arc<dyn SpiralClassifier>>,
}

impl ModelState {
    pub fn with_classifier(classifier: Arc<dyn SpiralClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    pub fn unavailable() -> Self {
        Self { classifier: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn classifier(&self) -> Option<&dyn SpiralClassifier> {
        self.classifier.as_deref()
    }
}
