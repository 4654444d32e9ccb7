use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::Aggregator;
use crate::client::SerpApiClient;
use crate::config::Credential;

pub mod handlers;
pub mod models;

/// Shared state of the HTTP surface.
pub struct AppState {
    pub client: SerpApiClient,
    pub aggregator: Aggregator,
    /// Used when a request does not carry its own API key.
    pub default_credential: Option<Credential>,
    pub pacing: std::time::Duration,
    /// Held for the whole batch so two requests never call the API concurrently.
    pub batch_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        client: SerpApiClient,
        aggregator: Aggregator,
        default_credential: Option<Credential>,
        pacing: std::time::Duration,
    ) -> Self {
        Self {
            client,
            aggregator,
            default_credential,
            pacing,
            batch_lock: Mutex::new(()),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/api/batch", post(handlers::batch_handler))
        .with_state(state)
        .layer(cors)
}
