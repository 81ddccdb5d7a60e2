//! Inference response types

use serde::{Deserialize, Serialize};

/// One ranked feature attribution entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationEntry {
    /// Display feature name (encoder prefixes stripped)
    pub feature: String,
    /// Signed contribution: positive pushes the default probability up
    pub value: f64,
}

/// Response body for `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub default_probability: f32,
    /// Top-K contributions, sorted by descending |value|
    pub explanation: Vec<ExplanationEntry>,
}
