use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The two outcomes the screening models can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ClassLabel {
    Healthy,
    Parkinson,
}

/// Index order matches the model's output vector.
pub const CLASS_LABELS: [ClassLabel; 2] = [ClassLabel::Healthy, ClassLabel::Parkinson];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub result: ClassLabel,
    pub confidence: f32,
}
