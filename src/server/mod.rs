// Bill Tally - Processing Server
// Receives encoded bills, extracts their expenses and returns category totals

pub mod handlers;

use crate::extractor::ExpenseExtractor;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Encoded bills are large; the default 2 MB body limit is far too small
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn ExpenseExtractor>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory served for every path that isn't an API route
    pub static_dir: PathBuf,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            static_dir: PathBuf::from("web"),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn create_app(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new().route("/health", get(handlers::health_check));

    Router::new()
        .route(crate::client::PROCESS_PATH, post(handlers::process_bills))
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
