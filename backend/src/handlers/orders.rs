//! Customer order HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{OrderPage, OrderWithItems, PageQuery, PlaceOrderInput};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::services::OrderService;
use crate::AppState;

/// Place an order for the current customer
pub async fn place_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<PlaceOrderInput>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    let service = OrderService::new(state.store, state.config);
    let order = service.place_order(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List the current customer's orders, newest first
pub async fn list_my_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<OrderPage<OrderWithItems>>> {
    let service = OrderService::new(state.store, state.config);
    let page = service.list_customer_orders(user.user_id, &query).await?;
    Ok(Json(page))
}

/// Get one of the current customer's orders
pub async fn get_my_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderWithItems>> {
    let service = OrderService::new(state.store, state.config);
    let order = service.get_customer_order(user.user_id, order_id).await?;
    Ok(Json(order))
}
