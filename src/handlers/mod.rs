//! HTTP request handlers for the chatrelay API

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::completion::{CompletionClient, HttpCompletionClient};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;

pub mod chat;
pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// Contains configuration, the completion client and metrics.
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: Arc<dyn CompletionClient>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState backed by the HTTP completion client
    pub fn new(config: Config) -> AppResult<Self> {
        let client = HttpCompletionClient::from_config(&config.upstream)?;
        Self::with_client(config, Arc::new(client))
    }

    /// Create a new AppState with a caller-provided completion client
    pub fn with_client(config: Config, client: Arc<dyn CompletionClient>) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            client,
            metrics: Arc::new(metrics),
        })
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the completion client
    pub fn client(&self) -> &dyn CompletionClient {
        self.client.as_ref()
    }

    /// Get reference to the metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the application router
///
/// API routes take precedence; every other path is served from the
/// configured static directory. Chat bodies are capped at
/// `server.max_request_bytes` instead of axum's 2 MB default.
pub fn app(state: AppState) -> Router {
    let server = &state.config().server;
    let static_files = ServeDir::new(&server.static_dir);
    let body_limit = DefaultBodyLimit::max(server.max_request_bytes);

    Router::new()
        .route("/api/chat", post(chat::handler).layer(body_limit))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .fallback_service(static_files)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
