//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Errors raised inside the inference pipeline.
///
/// Every failure surfaces to the caller as a failed response; nothing is
/// retried and no partial result (prediction without explanation) exists.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed required field in the request record
    #[error("schema error: {0}")]
    Schema(String),

    /// Malformed vocabulary artifact
    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    /// Underlying model call failed, including during attribution sampling
    #[error("inference error: {0}")]
    Inference(String),

    /// Attribution computation failed or did not converge
    #[error("explanation error: {0}")]
    Explanation(String),
}

#[derive(Debug)]
pub enum AppError {
    // Request errors
    SchemaError(String),
    ValidationError(String),

    // Pipeline errors
    InferenceError(String),
    ExplanationError(String),
    ExplanationTimeout,

    // Generic errors
    InternalError(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Schema(msg) => AppError::SchemaError(msg),
            PipelineError::Vocabulary(msg) => AppError::InternalError(msg),
            PipelineError::Inference(msg) => AppError::InferenceError(msg),
            PipelineError::Explanation(msg) => AppError::ExplanationError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::SchemaError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::InferenceError(msg) => {
                tracing::error!("Inference error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Model inference failed")
            }
            AppError::ExplanationError(msg) => {
                tracing::error!("Explanation error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Explanation failed")
            }
            AppError::ExplanationTimeout => {
                tracing::error!("Explanation timed out");
                (StatusCode::INTERNAL_SERVER_ERROR, "Explanation timed out")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
