//! In-memory store
//!
//! One mutex guards the whole state. A transaction holds the guard for its
//! lifetime and works on a copy that replaces the state on commit, so
//! transactions are serialised and a dropped transaction leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{
    Category, InventoryLog, LowStockItem, NewInventoryLog, Order, OrderItem, OrderStatus,
    OrderSummary, OrderWithItems, Page, Price, PriceHistory, SetPriceInput, Vegetable,
    VegetableSnapshot,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{NewOrder, OrderFilter, Store, StoreTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    categories: HashMap<Uuid, Category>,
    vegetables: HashMap<Uuid, Vegetable>,
    prices: Vec<Price>,
    price_history: Vec<PriceHistory>,
    /// Insertion order, oldest first
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    inventory_logs: Vec<InventoryLog>,
}

/// Vegetable to add to the catalog
#[derive(Debug, Clone)]
pub struct NewVegetable {
    pub category_id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub available: bool,
    pub stock_kg: Decimal,
    pub min_stock_alert: Decimal,
}

/// Process-local store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryState {
    fn with_items(&self, order: &Order) -> OrderWithItems {
        OrderWithItems {
            order: order.clone(),
            items: self
                .items
                .iter()
                .filter(|i| i.order_id == order.id)
                .cloned()
                .collect(),
        }
    }

    fn latest_price(&self, vegetable_id: Uuid) -> Option<Price> {
        self.prices
            .iter()
            .filter(|p| p.vegetable_id == vegetable_id)
            .max_by_key(|p| p.effective_from)
            .cloned()
    }

    fn vegetable_mut(&mut self, vegetable_id: Uuid) -> AppResult<&mut Vegetable> {
        self.vegetables
            .get_mut(&vegetable_id)
            .ok_or_else(|| AppError::NotFound("Vegetable".to_string()))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category; names are unique
    pub async fn add_category(&self, name: &str, sort_order: i32) -> AppResult<Category> {
        let mut state = self.state.lock().await;
        if state.categories.values().any(|c| c.name == name) {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: format!("Category {} already exists", name),
            });
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            name_hindi: None,
            name_kannada: None,
            sort_order,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    pub async fn add_vegetable(&self, input: NewVegetable) -> AppResult<Vegetable> {
        let mut state = self.state.lock().await;
        if !state.categories.contains_key(&input.category_id) {
            return Err(AppError::NotFound("Category".to_string()));
        }
        let now = Utc::now();
        let vegetable = Vegetable {
            id: Uuid::new_v4(),
            category_id: input.category_id,
            name: input.name,
            name_hindi: None,
            name_kannada: None,
            emoji: input.emoji,
            image: None,
            available: input.available,
            stock_kg: input.stock_kg,
            min_stock_alert: input.min_stock_alert,
            created_at: now,
            updated_at: now,
        };
        state.vegetables.insert(vegetable.id, vegetable.clone());
        Ok(vegetable)
    }

    /// Soft-delete or restore a vegetable
    pub async fn set_available(&self, vegetable_id: Uuid, available: bool) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let vegetable = state.vegetable_mut(vegetable_id)?;
        vegetable.available = available;
        vegetable.updated_at = Utc::now();
        Ok(())
    }

    pub async fn vegetable(&self, vegetable_id: Uuid) -> Option<Vegetable> {
        self.state.lock().await.vegetables.get(&vegetable_id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn order_item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Every ledger entry, oldest first
    pub async fn all_inventory_logs(&self) -> Vec<InventoryLog> {
        self.state.lock().await.inventory_logs.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| state.with_items(o)))
    }

    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<OrderWithItems>, u64)> {
        let state = self.state.lock().await;
        let matching: Vec<&Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.customer_id == customer_id)
            .collect();
        let total = matching.len() as u64;
        let orders = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|o| state.with_items(o))
            .collect();
        Ok((orders, total))
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> AppResult<(Vec<OrderSummary>, u64)> {
        let state = self.state.lock().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<&Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| filter.customer_id.map_or(true, |c| o.customer_id == c))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| {
                search
                    .as_ref()
                    .map_or(true, |s| o.order_number.to_lowercase().contains(s))
            })
            .collect();
        let total = matching.len() as u64;
        let orders = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|o| OrderSummary {
                order: o.clone(),
                item_count: state.items.iter().filter(|i| i.order_id == o.id).count() as i64,
            })
            .collect();
        Ok((orders, total))
    }

    async fn inventory_logs(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<InventoryLog>> {
        let state = self.state.lock().await;
        Ok(state
            .inventory_logs
            .iter()
            .rev()
            .filter(|l| l.vegetable_id == vegetable_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn price_history(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<PriceHistory>> {
        let state = self.state.lock().await;
        Ok(state
            .price_history
            .iter()
            .rev()
            .filter(|h| h.vegetable_id == vegetable_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn low_stock(&self, limit: u32) -> AppResult<Vec<LowStockItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<LowStockItem> = state
            .vegetables
            .values()
            .filter(|v| v.available && v.stock_kg <= v.min_stock_alert)
            .map(|v| LowStockItem {
                id: v.id,
                name: v.name.clone(),
                emoji: v.emoji.clone(),
                stock_kg: v.stock_kg,
                min_stock_alert: v.min_stock_alert,
            })
            .collect();
        items.sort_by(|a, b| a.stock_kg.cmp(&b.stock_kg));
        items.truncate(limit as usize);
        Ok(items)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_vegetables(&mut self, ids: &[Uuid]) -> AppResult<Vec<VegetableSnapshot>> {
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.dedup();

        let state = &self.working;
        Ok(sorted
            .iter()
            .filter_map(|id| state.vegetables.get(id))
            .map(|v| VegetableSnapshot {
                id: v.id,
                name: v.name.clone(),
                available: v.available,
                stock_kg: v.stock_kg,
                min_stock_alert: v.min_stock_alert,
                latest_price: state.latest_price(v.id),
            })
            .collect())
    }

    async fn decrement_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal> {
        let vegetable = self.working.vegetable_mut(vegetable_id)?;
        let remaining = vegetable.stock_kg - amount_kg;
        if remaining < Decimal::ZERO {
            return Err(AppError::Internal(format!(
                "stock of {} would become negative",
                vegetable.name
            )));
        }
        vegetable.stock_kg = remaining;
        vegetable.updated_at = Utc::now();
        Ok(remaining)
    }

    async fn increment_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal> {
        let vegetable = self.working.vegetable_mut(vegetable_id)?;
        vegetable.stock_kg = vegetable.stock_kg.checked_add(amount_kg).ok_or_else(|| {
            AppError::Internal(format!("stock of {} is out of range", vegetable.name))
        })?;
        vegetable.updated_at = Utc::now();
        Ok(vegetable.stock_kg)
    }

    async fn insert_price(&mut self, vegetable_id: Uuid, input: &SetPriceInput) -> AppResult<Price> {
        self.working.vegetable_mut(vegetable_id)?;
        let price = Price {
            id: Uuid::new_v4(),
            vegetable_id,
            price_per_kg: input.price_per_kg,
            price_per_piece: input.price_per_piece,
            price_per_packet: input.price_per_packet,
            price_per_bundle: input.price_per_bundle,
            packet_weight: input.packet_weight,
            effective_from: Utc::now(),
        };
        self.working.prices.push(price.clone());
        Ok(price)
    }

    async fn append_price_history(
        &mut self,
        vegetable_id: Uuid,
        old_price: Option<Decimal>,
        new_price: Decimal,
    ) -> AppResult<PriceHistory> {
        let entry = PriceHistory {
            id: Uuid::new_v4(),
            vegetable_id,
            old_price,
            new_price,
            changed_at: Utc::now(),
        };
        self.working.price_history.push(entry.clone());
        Ok(entry)
    }

    async fn max_order_sequence(&mut self, day_prefix: &str) -> AppResult<Option<u32>> {
        Ok(self
            .working
            .orders
            .iter()
            .filter_map(|o| shared::parse_sequence(day_prefix, &o.order_number))
            .max())
    }

    async fn insert_order(&mut self, new: &NewOrder) -> AppResult<OrderWithItems> {
        if self
            .working
            .orders
            .iter()
            .any(|o| o.order_number == new.order_number)
        {
            return Err(AppError::OrderNumberConflict(new.order_number.clone()));
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: new.order_number.clone(),
            customer_id: new.customer_id,
            status: OrderStatus::Pending,
            total_amount: new.total_amount,
            address: new.address.clone(),
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = new
            .items
            .iter()
            .map(|i| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                vegetable_id: i.vegetable_id,
                quantity: i.quantity,
                unit: i.unit,
                unit_price: i.unit_price,
                total_price: i.total_price,
            })
            .collect();

        self.working.orders.push(order.clone());
        self.working.items.extend(items.iter().cloned());
        Ok(OrderWithItems { order, items })
    }

    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        let state = &self.working;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| state.with_items(o)))
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let order = self
            .working
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn append_inventory_log(&mut self, entry: &NewInventoryLog) -> AppResult<InventoryLog> {
        let log = InventoryLog {
            id: Uuid::new_v4(),
            vegetable_id: entry.vegetable_id,
            order_id: entry.order_id,
            change_type: entry.change_type,
            quantity_kg: entry.quantity_kg,
            notes: entry.notes.clone(),
            created_at: Utc::now(),
        };
        self.working.inventory_logs.push(log.clone());
        Ok(log)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
