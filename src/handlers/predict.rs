//! Prediction handler
//!
//! `POST /predict`: one record in, probability + top-K explanation out.
//! The pipeline is CPU-bound (attribution issues many model calls), so it
//! runs on the blocking pool under a hard timeout.

use std::time::Duration;

use axum::{extract::State, Json};

use crate::models::{PredictResponse, Record};
use crate::{pipeline, AppError, AppResult, AppState};

pub async fn predict(
    State(state): State<AppState>,
    Json(record): Json<Record>,
) -> AppResult<Json<PredictResponse>> {
    let ctx = state.ctx.clone();
    let deadline = Duration::from_millis(state.config.explain_timeout_ms);

    let task = tokio::task::spawn_blocking(move || pipeline::run(&ctx, &record));

    match tokio::time::timeout(deadline, task).await {
        Err(_) => Err(AppError::ExplanationTimeout),
        Ok(Err(join_err)) => Err(AppError::InternalError(format!(
            "pipeline task failed: {join_err}"
        ))),
        Ok(Ok(result)) => Ok(Json(result?)),
    }
}
