//! Admin catalog HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{
    AdjustStockInput, InventoryLog, LowStockItem, Price, PriceHistory, SetPriceInput,
    StockAdjustment,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::services::CatalogService;
use crate::AppState;

/// Publish a new price for a vegetable
pub async fn set_price(
    State(state): State<AppState>,
    Path(vegetable_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<SetPriceInput>,
) -> AppResult<Json<Price>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.set_price(vegetable_id, input).await?))
}

/// Correct a vegetable's stock level
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(vegetable_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<AdjustStockInput>,
) -> AppResult<Json<StockAdjustment>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.adjust_stock(vegetable_id, input).await?))
}

pub async fn price_history(
    State(state): State<AppState>,
    Path(vegetable_id): Path<Uuid>,
) -> AppResult<Json<Vec<PriceHistory>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.price_history(vegetable_id).await?))
}

pub async fn inventory_logs(
    State(state): State<AppState>,
    Path(vegetable_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryLog>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.inventory_logs(vegetable_id).await?))
}

/// Available vegetables at or below their alert threshold
pub async fn low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<LowStockItem>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.low_stock().await?))
}
