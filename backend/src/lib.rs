//! Greengrocer storefront backend
//!
//! Order placement, cancellation and catalog maintenance for a grocery
//! storefront, keeping stock consistent under concurrent orders.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use store::Store;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Greengrocer Storefront API v1.0"
}
