//! Store wrapper that records transactional calls and can refuse order
//! numbers, for tests that need to see lock order or exercise retries

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use greengrocer_backend::store::{MemoryStore, NewOrder, OrderFilter, Store, StoreTx};
use greengrocer_backend::{AppError, AppResult};
use rust_decimal::Decimal;
use shared::{
    InventoryLog, LowStockItem, NewInventoryLog, OrderStatus, OrderSummary, OrderWithItems, Page,
    Price, PriceHistory, SetPriceInput, VegetableSnapshot,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    LockVegetables(Vec<Uuid>),
    DecrementStock(Uuid),
    IncrementStock(Uuid),
    InsertOrder(String),
    Commit,
}

#[derive(Clone)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    refused_numbers: Arc<AtomicU32>,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            calls: Arc::default(),
            refused_numbers: Arc::default(),
        }
    }

    /// The next `count` order inserts fail as if the number were taken
    pub fn refuse_order_numbers(&self, count: u32) {
        self.refused_numbers.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        Ok(Box::new(RecordingTx {
            inner: self.inner.begin().await?,
            calls: self.calls.clone(),
            refused_numbers: self.refused_numbers.clone(),
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        self.inner.find_order(order_id).await
    }

    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<OrderWithItems>, u64)> {
        self.inner.list_customer_orders(customer_id, page).await
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> AppResult<(Vec<OrderSummary>, u64)> {
        self.inner.list_orders(filter, page).await
    }

    async fn inventory_logs(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<InventoryLog>> {
        self.inner.inventory_logs(vegetable_id, limit).await
    }

    async fn price_history(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<PriceHistory>> {
        self.inner.price_history(vegetable_id, limit).await
    }

    async fn low_stock(&self, limit: u32) -> AppResult<Vec<LowStockItem>> {
        self.inner.low_stock(limit).await
    }
}

struct RecordingTx {
    inner: Box<dyn StoreTx>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    refused_numbers: Arc<AtomicU32>,
}

impl RecordingTx {
    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StoreTx for RecordingTx {
    async fn lock_vegetables(&mut self, ids: &[Uuid]) -> AppResult<Vec<VegetableSnapshot>> {
        self.record(StoreCall::LockVegetables(ids.to_vec()));
        self.inner.lock_vegetables(ids).await
    }

    async fn decrement_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal> {
        self.record(StoreCall::DecrementStock(vegetable_id));
        self.inner.decrement_stock(vegetable_id, amount_kg).await
    }

    async fn increment_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal> {
        self.record(StoreCall::IncrementStock(vegetable_id));
        self.inner.increment_stock(vegetable_id, amount_kg).await
    }

    async fn insert_price(&mut self, vegetable_id: Uuid, input: &SetPriceInput) -> AppResult<Price> {
        self.inner.insert_price(vegetable_id, input).await
    }

    async fn append_price_history(
        &mut self,
        vegetable_id: Uuid,
        old_price: Option<Decimal>,
        new_price: Decimal,
    ) -> AppResult<PriceHistory> {
        self.inner
            .append_price_history(vegetable_id, old_price, new_price)
            .await
    }

    async fn max_order_sequence(&mut self, day_prefix: &str) -> AppResult<Option<u32>> {
        self.inner.max_order_sequence(day_prefix).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> AppResult<OrderWithItems> {
        self.record(StoreCall::InsertOrder(order.order_number.clone()));
        let refused = self
            .refused_numbers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(AppError::OrderNumberConflict(order.order_number.clone()));
        }
        self.inner.insert_order(order).await
    }

    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        self.inner.lock_order(order_id).await
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        self.inner.set_order_status(order_id, status).await
    }

    async fn append_inventory_log(&mut self, entry: &NewInventoryLog) -> AppResult<InventoryLog> {
        self.inner.append_inventory_log(entry).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.record(StoreCall::Commit);
        self.inner.commit().await
    }
}
