use std::cmp::Ordering;

use image::imageops::FilterType;
use ndarray::Array4;
use shared::{CLASS_LABELS, PredictionResponse};

use crate::inference::classifier::ModelState;

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Model not loaded")]
    ServiceUnavailable,
    #[error("Image preprocessing failed: {0}")]
    Preprocess(String),
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Runs the classifier over already-validated image bytes.
/// The availability check comes first so an unloaded model never pays for a
/// decode; callers guarantee the bytes passed validation.
pub fn classify_spiral(
    model: &ModelState,
    image_data: &[u8],
) -> Result<PredictionResponse, PredictError> {
    let classifier = model.classifier().ok_or(PredictError::ServiceUnavailable)?;

    let input = preprocess(image_data)?;
    let probs = classifier
        .predict(&input)
        .map_err(|e| PredictError::Inference(e.to_string()))?;

    let (index, confidence) = probs
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(i, &v)| (i, v))
        .ok_or_else(|| PredictError::Inference("empty probability vector".to_string()))?;

    let result = CLASS_LABELS
        .get(index)
        .copied()
        .ok_or_else(|| PredictError::Inference(format!("unexpected class index {index}")))?;

    Ok(PredictionResponse { result, confidence })
}

/// Decode, force RGB, resize to the model's fixed 224x224 input grid and
/// scale to [0,1]. The `(1, 224, 224, 3)` shape is a hard contract of the
/// classifier collaborator.
pub fn preprocess(image_data: &[u8]) -> Result<Array4<f32>, PredictError> {
    let img = image::load_from_memory(image_data)
        .map_err(|e| PredictError::Preprocess(e.to_string()))?;
    let rgb = img.resize_exact(224, 224, FilterType::Triangle).to_rgb8();

    let mut input = Array4::<f32>::zeros((1, 224, 224, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            input[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }
    Ok(input)
}
