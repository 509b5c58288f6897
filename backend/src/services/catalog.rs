//! Admin catalog maintenance: prices, stock corrections and stock reports

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{
    AdjustStockInput, FieldError, InventoryLog, LowStockItem, NewInventoryLog, Price,
    PriceHistory, SetPriceInput, StockAdjustment, VegetableSnapshot,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

const PRICE_HISTORY_LIMIT: u32 = 50;
const INVENTORY_LOG_LIMIT: u32 = 100;
const LOW_STOCK_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

async fn locked_vegetable(tx: &mut dyn StoreTx, vegetable_id: Uuid) -> AppResult<VegetableSnapshot> {
    tx.lock_vegetables(&[vegetable_id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Vegetable".to_string()))
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Publish a new price record effective now.
    ///
    /// A history entry is written only when the per-kg price changes.
    pub async fn set_price(&self, vegetable_id: Uuid, input: SetPriceInput) -> AppResult<Price> {
        input
            .validate()
            .map_err(|e| AppError::ValidationErrors(FieldError::collect("", &e)))?;

        let mut tx = self.store.begin().await?;
        let vegetable = locked_vegetable(tx.as_mut(), vegetable_id).await?;
        let old_per_kg = vegetable.latest_price.as_ref().and_then(|p| p.price_per_kg);

        let price = tx.insert_price(vegetable_id, &input).await?;
        if let Some(new_per_kg) = input.price_per_kg {
            if old_per_kg != Some(new_per_kg) {
                tx.append_price_history(vegetable_id, old_per_kg, new_per_kg)
                    .await?;
            }
        }
        tx.commit().await?;

        tracing::info!(
            vegetable_id = %vegetable_id,
            vegetable = %vegetable.name,
            price_per_kg = ?price.price_per_kg,
            "Price updated"
        );
        Ok(price)
    }

    /// Set stock to an absolute level, logging the signed difference
    pub async fn adjust_stock(
        &self,
        vegetable_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<StockAdjustment> {
        input
            .validate()
            .map_err(|e| AppError::ValidationErrors(FieldError::collect("", &e)))?;

        let mut tx = self.store.begin().await?;
        let vegetable = locked_vegetable(tx.as_mut(), vegetable_id).await?;
        let delta = input.stock_kg - vegetable.stock_kg;

        let log = if delta.is_zero() {
            None
        } else {
            if delta > Decimal::ZERO {
                tx.increment_stock(vegetable_id, delta).await?;
            } else {
                tx.decrement_stock(vegetable_id, -delta).await?;
            }
            Some(
                tx.append_inventory_log(&NewInventoryLog::adjustment(
                    vegetable_id,
                    delta,
                    input.note.clone(),
                ))
                .await?,
            )
        };
        tx.commit().await?;

        tracing::info!(
            vegetable_id = %vegetable_id,
            vegetable = %vegetable.name,
            from = %vegetable.stock_kg,
            to = %input.stock_kg,
            "Stock adjusted"
        );

        Ok(StockAdjustment {
            vegetable_id,
            previous_stock_kg: vegetable.stock_kg,
            stock_kg: input.stock_kg,
            log,
        })
    }

    pub async fn price_history(&self, vegetable_id: Uuid) -> AppResult<Vec<PriceHistory>> {
        self.store.price_history(vegetable_id, PRICE_HISTORY_LIMIT).await
    }

    pub async fn inventory_logs(&self, vegetable_id: Uuid) -> AppResult<Vec<InventoryLog>> {
        self.store.inventory_logs(vegetable_id, INVENTORY_LOG_LIMIT).await
    }

    pub async fn low_stock(&self) -> AppResult<Vec<LowStockItem>> {
        self.store.low_stock(LOW_STOCK_LIMIT).await
    }
}
