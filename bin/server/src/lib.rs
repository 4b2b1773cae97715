//! ticker-agent HTTP service.
//!
//! Exposes the stock-query agent over HTTP: a blocking JSON endpoint and a
//! server-sent event stream that relays each step of a run as it happens.

pub mod config;
pub mod error;
pub mod routes;
pub mod sse;
pub mod state;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::InitError;
pub use state::{AgentHandle, AppState, build_agent};

/// Builds the router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/invoke", post(routes::invoke))
        .route("/invoke-simple", post(routes::invoke_simple))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
