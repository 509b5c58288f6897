//! Order placement and order reads

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use shared::{
    day_prefix, format_order_number, next_sequence, NewInventoryLog, OrderItemInput, OrderPage,
    OrderWithItems, PageQuery, PlaceOrderInput, PricingError, PricingResolver, VegetableSnapshot,
};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{NewOrder, NewOrderItem, Store};

/// Order Transaction Engine
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    config: Arc<Config>,
}

/// A line that passed every check, priced and ready to insert
#[derive(Debug, Clone)]
pub struct PlannedLine {
    pub vegetable_id: Uuid,
    pub name: String,
    pub item: NewOrderItem,
    pub stock_deduct_kg: Decimal,
    pub min_stock_alert: Decimal,
}

/// Check and price every requested line against the locked vegetables.
///
/// Checks run in stages over the whole cart: existence, availability and
/// price presence first, then unit resolution, then stock. The first failure
/// wins. Stock is checked against a running remainder, so repeated lines of
/// one vegetable are judged on their combined demand.
pub fn plan_order(
    resolver: &PricingResolver,
    items: &[OrderItemInput],
    vegetables: &HashMap<Uuid, VegetableSnapshot>,
) -> AppResult<Vec<PlannedLine>> {
    for item in items {
        let vegetable = vegetables
            .get(&item.vegetable_id)
            .ok_or(AppError::VegetableNotFound(item.vegetable_id))?;
        if !vegetable.available {
            return Err(AppError::VegetableUnavailable(vegetable.name.clone()));
        }
        if vegetable.latest_price.is_none() {
            return Err(AppError::NoPriceSet(vegetable.name.clone()));
        }
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let vegetable = vegetables
            .get(&item.vegetable_id)
            .ok_or(AppError::VegetableNotFound(item.vegetable_id))?;
        let price = vegetable
            .latest_price
            .as_ref()
            .ok_or_else(|| AppError::NoPriceSet(vegetable.name.clone()))?;
        let resolution = resolver
            .resolve(price, item.unit, item.quantity)
            .map_err(|e| match e {
                PricingError::UnitNotSold(unit) => AppError::UnitNotSold {
                    name: vegetable.name.clone(),
                    unit,
                },
                PricingError::OutOfRange(_) => AppError::QuantityOutOfRange(vegetable.name.clone()),
            })?;
        lines.push(PlannedLine {
            vegetable_id: vegetable.id,
            name: vegetable.name.clone(),
            item: NewOrderItem {
                vegetable_id: vegetable.id,
                quantity: item.quantity,
                unit: item.unit,
                unit_price: resolution.unit_price,
                total_price: resolution.line_total,
            },
            stock_deduct_kg: resolution.stock_deduct_kg,
            min_stock_alert: vegetable.min_stock_alert,
        });
    }

    let mut remaining: HashMap<Uuid, Decimal> =
        vegetables.values().map(|v| (v.id, v.stock_kg)).collect();
    for line in &lines {
        let available = remaining.entry(line.vegetable_id).or_default();
        if line.stock_deduct_kg > *available {
            return Err(AppError::InsufficientStock {
                name: line.name.clone(),
                available: available.normalize(),
            });
        }
        *available -= line.stock_deduct_kg;
    }

    Ok(lines)
}

/// Sum of the planned line totals
pub fn order_total(lines: &[PlannedLine]) -> AppResult<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.item.total_price))
        .ok_or_else(|| AppError::Validation {
            field: "items".to_string(),
            message: "Order total is too large".to_string(),
        })
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    fn resolver(&self) -> PricingResolver {
        PricingResolver::new(self.config.pricing.clone())
    }

    /// Place an order for `customer_id`, all or nothing
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        input: PlaceOrderInput,
    ) -> AppResult<OrderWithItems> {
        input.check().map_err(AppError::ValidationErrors)?;

        let attempts = self.config.orders.max_number_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.try_place_order(customer_id, &input).await {
                Err(AppError::OrderNumberConflict(number)) if attempt < attempts => {
                    tracing::warn!(
                        order_number = %number,
                        attempt,
                        "Order number taken concurrently, retrying placement"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_place_order(
        &self,
        customer_id: Uuid,
        input: &PlaceOrderInput,
    ) -> AppResult<OrderWithItems> {
        let mut tx = self.store.begin().await?;

        let ids: Vec<Uuid> = input.items.iter().map(|i| i.vegetable_id).collect();
        let vegetables: HashMap<Uuid, VegetableSnapshot> = tx
            .lock_vegetables(&ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let lines = plan_order(&self.resolver(), &input.items, &vegetables)?;
        let total_amount = order_total(&lines)?;

        let prefix = day_prefix(&self.config.orders.number_prefix, Utc::now().date_naive());
        let sequence = next_sequence(tx.max_order_sequence(&prefix).await?);
        let order_number = format_order_number(&prefix, sequence);

        let order = tx
            .insert_order(&NewOrder {
                order_number: order_number.clone(),
                customer_id,
                total_amount,
                address: input.address.clone(),
                notes: input.notes.clone(),
                items: lines.iter().map(|l| l.item.clone()).collect(),
            })
            .await?;

        for line in &lines {
            let remaining = tx
                .decrement_stock(line.vegetable_id, line.stock_deduct_kg)
                .await?;
            tx.append_inventory_log(&NewInventoryLog::sale(
                line.vegetable_id,
                order.order.id,
                &order_number,
                line.stock_deduct_kg,
            ))
            .await?;

            if remaining <= line.min_stock_alert {
                tracing::warn!(
                    vegetable_id = %line.vegetable_id,
                    vegetable = %line.name,
                    stock_kg = %remaining,
                    min_stock_alert = %line.min_stock_alert,
                    "Stock at or below alert threshold"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(
            order_number = %order.order.order_number,
            customer_id = %customer_id,
            total_amount = %order.order.total_amount,
            lines = order.items.len(),
            "Order placed"
        );

        Ok(order)
    }

    /// One customer's orders, newest first
    pub async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        query: &PageQuery,
    ) -> AppResult<OrderPage<OrderWithItems>> {
        let orders = &self.config.orders;
        let page = query.resolve(orders.customer_page_size, orders.max_page_size);
        let (rows, total) = self.store.list_customer_orders(customer_id, page).await?;
        Ok(OrderPage::new(rows, total, page))
    }

    /// An order, visible only to the customer who placed it
    pub async fn get_customer_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<OrderWithItems> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if order.order.customer_id != customer_id {
            return Err(AppError::Forbidden(
                "You do not have access to this order".to_string(),
            ));
        }
        Ok(order)
    }
}
