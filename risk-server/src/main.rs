//! AECOPD Hypoalbuminemia Risk Calculator - HTTP Server
//!
//! Hosts the risk scorer behind a small JSON API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      RISK SERVER (Axum)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /api/v1/assess                                         │
//! │     │  input boundary (reject / clamp)                       │
//! │     ▼                                                        │
//! │  assemble ──▶ RiskScorer ──▶ RiskReport ──▶ JSON             │
//! │                   │                                          │
//! │          Arc<dyn Classifier>  (loaded once at startup)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use albumin_risk_core::constants;
use albumin_risk_core::model::ModelMetadata;
use albumin_risk_core::{ModelLoader, RiskScorer};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "albumin_risk_server=debug,albumin_risk_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();

    tracing::info!(
        "{} v{} starting ({})...",
        constants::APP_NAME,
        constants::APP_VERSION,
        constants::TARGET_POPULATION
    );
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        "Bounds policy: {:?}, report locale: {:?}",
        config.bounds_policy,
        config.report_locale
    );

    // Load the classifier once; a missing or corrupt artifact stops startup
    let mut loader = ModelLoader::new(&config.model_path);
    if let Some(digest) = &config.model_sha256 {
        loader = loader.expect_sha256(digest.clone());
    } else if config.is_production() {
        tracing::warn!("MODEL_SHA256 not set; artifact integrity is not verified");
    }

    let model = loader
        .load()
        .map_err(|e| {
            tracing::error!("❌ Model missing or unreadable: {}", e);
            e
        })
        .with_context(|| format!("failed to load model from {}", config.model_path))?;

    let state = AppState {
        scorer: Arc::new(RiskScorer::with_default_threshold(model.classifier)),
        model: Arc::new(model.metadata),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<RiskScorer>,
    pub model: Arc<ModelMetadata>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/model", get(handlers::model::info))
        .route("/api/v1/defaults", get(handlers::model::defaults))
        .route("/api/v1/assess", post(handlers::assess::assess))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
