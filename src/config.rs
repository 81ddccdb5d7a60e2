//! Configuration module

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Path to the ONNX dual-input model
    pub model_path: String,

    /// Path to the fitted tokenizer vocabulary (JSON)
    pub vocab_path: String,

    /// Path to the fitted column preprocessor (JSON)
    pub preprocessor_path: String,

    /// Optional path to raw background records (JSON array).
    /// When unset, a single neutral background point is used.
    pub background_data_path: Option<String>,

    /// Number of k-means centroids when summarizing background data
    pub background_clusters: usize,

    /// Coalition sample budget for the attribution engine.
    /// Higher = more faithful attributions, more predictor calls.
    pub shap_samples: usize,

    /// RNG seed for coalition sampling (fixed so identical requests
    /// produce identical explanations)
    pub shap_seed: u64,

    /// Number of explanation entries returned per prediction
    pub top_k: usize,

    /// Hard ceiling on per-request explanation time
    pub explain_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "artifacts/loan_default_model.onnx".to_string()),

            vocab_path: env::var("VOCAB_PATH")
                .unwrap_or_else(|_| "artifacts/tokenizer.json".to_string()),

            preprocessor_path: env::var("PREPROCESSOR_PATH")
                .unwrap_or_else(|_| "artifacts/preprocessor.json".to_string()),

            background_data_path: env::var("BACKGROUND_DATA_PATH").ok(),

            background_clusters: env::var("BACKGROUND_CLUSTERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            shap_samples: env::var("SHAP_SAMPLES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2048),

            shap_seed: env::var("SHAP_SEED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(42),

            top_k: env::var("TOP_K")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            explain_timeout_ms: env::var("EXPLAIN_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15_000),
        }
    }
}
