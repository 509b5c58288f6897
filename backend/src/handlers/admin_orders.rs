//! Admin order HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{AdminOrderQuery, OrderPage, OrderSummary, OrderWithItems, UpdateStatusInput};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::services::FulfillmentService;
use crate::AppState;

/// List all orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> AppResult<Json<OrderPage<OrderSummary>>> {
    let service = FulfillmentService::new(state.store, state.config);
    Ok(Json(service.list_orders(&query).await?))
}

/// Get any order
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderWithItems>> {
    let service = FulfillmentService::new(state.store, state.config);
    Ok(Json(service.get_order(order_id).await?))
}

/// Move an order along its lifecycle or cancel it
pub async fn update_order_status(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(order_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateStatusInput>,
) -> AppResult<Json<OrderWithItems>> {
    tracing::debug!(admin_id = %admin.user_id, order_id = %order_id, status = %input.status, "Status change requested");
    let service = FulfillmentService::new(state.store, state.config);
    let order = service.update_order_status(order_id, input.status).await?;
    Ok(Json(order))
}
