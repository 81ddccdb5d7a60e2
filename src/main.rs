//! Lendscore API Server
//!
//! Loan-default scoring service: one inference endpoint returning a
//! default probability together with a ranked feature-attribution
//! explanation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        LENDSCORE API                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────────────────────────────────────┐  │
//! │  │  HTTP    │   │  Inference pipeline                     │  │
//! │  │  (Axum)  │──▶│  transform ─▶ vectorize ─▶ predict      │  │
//! │  │          │   │       └──────▶ explain ─▶ format        │  │
//! │  └──────────┘   └──────────────────┬──────────────────────┘  │
//! │                                    ▼                         │
//! │              ┌──────────────────────────────────┐            │
//! │              │ Fitted artifacts (read-only)     │            │
//! │              │ ONNX model · vocabulary · schema │            │
//! │              │ background distribution          │            │
//! │              └──────────────────────────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod models;
mod pipeline;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lendscore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Lendscore server starting...");

    // Load all fitted artifacts once; they stay immutable for the
    // process lifetime
    let ctx = pipeline::ServiceContext::from_config(&config)
        .expect("Failed to load model artifacts");
    tracing::info!("Model and artifacts loaded successfully");

    let state = AppState {
        ctx: Arc::new(ctx),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<pipeline::ServiceContext>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
