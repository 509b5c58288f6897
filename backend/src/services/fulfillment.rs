//! Order status changes and the admin order views
//!
//! Cancelling an order puts its stock back. Each line is converted to
//! kilograms with [`PricingResolver::restoration_kg`] from its frozen
//! quantity and unit; packets restore a flat `packet_restore_kg` each, not
//! the packet weight they were sold with.

use std::sync::Arc;

use shared::{
    AdminOrderQuery, NewInventoryLog, OrderPage, OrderStatus, OrderSummary, OrderWithItems,
    PricingResolver,
};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{OrderFilter, Store};

/// Cancellation / Restoration Engine plus admin order reads
#[derive(Clone)]
pub struct FulfillmentService {
    store: Arc<dyn Store>,
    config: Arc<Config>,
}

impl FulfillmentService {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Move an order to `new_status`, restoring stock when it is cancelled
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> AppResult<OrderWithItems> {
        let mut tx = self.store.begin().await?;

        let current = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        let from = current.order.status;
        from.check_transition(new_status)?;

        if new_status == OrderStatus::Cancelled {
            let resolver = PricingResolver::new(self.config.pricing.clone());
            // Same lock order as placement: sorted vegetable ids
            let ids: Vec<Uuid> = current.items.iter().map(|i| i.vegetable_id).collect();
            tx.lock_vegetables(&ids).await?;
            for item in &current.items {
                let restored_kg = resolver
                    .restoration_kg(item.unit, item.quantity)
                    .map_err(|e| {
                        AppError::Internal(format!("cannot restore order item {}: {}", item.id, e))
                    })?;
                let stock_kg = tx.increment_stock(item.vegetable_id, restored_kg).await?;
                tx.append_inventory_log(&NewInventoryLog::cancellation(
                    item.vegetable_id,
                    current.order.id,
                    &current.order.order_number,
                    restored_kg,
                ))
                .await?;
                tracing::info!(
                    order_number = %current.order.order_number,
                    vegetable_id = %item.vegetable_id,
                    restored_kg = %restored_kg,
                    stock_kg = %stock_kg,
                    "Stock restored for cancelled order"
                );
            }
        }

        tx.set_order_status(order_id, new_status).await?;
        let updated = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        tx.commit().await?;

        tracing::info!(
            order_number = %updated.order.order_number,
            from = %from,
            to = %new_status,
            "Order status changed"
        );

        Ok(updated)
    }

    /// All orders, newest first, optionally filtered by status and order number
    pub async fn list_orders(&self, query: &AdminOrderQuery) -> AppResult<OrderPage<OrderSummary>> {
        let status = match query.status.as_deref().map(str::trim) {
            None | Some("") | Some("ALL") => None,
            Some(s) => Some(s.parse::<OrderStatus>().map_err(|message| AppError::Validation {
                field: "status".to_string(),
                message,
            })?),
        };
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let orders = &self.config.orders;
        let page = query
            .page_query()
            .resolve(orders.admin_page_size, orders.max_page_size);
        let filter = OrderFilter {
            customer_id: None,
            status,
            search,
        };
        let (rows, total) = self.store.list_orders(&filter, page).await?;
        Ok(OrderPage::new(rows, total, page))
    }

    /// Any order with its items
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderWithItems> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }
}
