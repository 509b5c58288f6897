//! Route definitions for the Greengrocer storefront

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, require_admin, require_customer},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Customer routes
        .nest("/orders", order_routes(state.clone()))
        // Admin routes
        .nest("/admin", admin_routes(state))
}

/// Customer order routes (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::place_order).get(handlers::list_my_orders))
        .route("/:order_id", get(handlers::get_my_order))
        .route_layer(middleware::from_fn(require_customer))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Admin routes (protected, admin role)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", get(handlers::list_orders))
        .route("/orders/:order_id", get(handlers::get_order))
        .route("/orders/:order_id/status", put(handlers::update_order_status))
        .route("/vegetables/low-stock", get(handlers::low_stock))
        .route("/vegetables/:vegetable_id/price", put(handlers::set_price))
        .route("/vegetables/:vegetable_id/stock", put(handlers::adjust_stock))
        .route(
            "/vegetables/:vegetable_id/price-history",
            get(handlers::price_history),
        )
        .route(
            "/vegetables/:vegetable_id/inventory-logs",
            get(handlers::inventory_logs),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
