//! Storage layer: catalog, orders and the inventory ledger
//!
//! Every mutation goes through a [`StoreTx`]. Reads made through a
//! transaction lock what they read until commit, so the stock used for a
//! check is the stock the decrement applies to. Dropping a transaction
//! without calling [`StoreTx::commit`] rolls it back.
//!
//! # Implementations
//!
//! - `PgStore`: PostgreSQL with row locks
//! - `MemoryStore`: process-local store serialised by one mutex

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    InventoryLog, LowStockItem, NewInventoryLog, OrderStatus, OrderSummary, OrderWithItems, Page,
    Price, PriceHistory, SetPriceInput, Unit, VegetableSnapshot,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Line of an order about to be inserted
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub vegetable_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Order about to be inserted, status `Pending`
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: Uuid,
    pub total_amount: Decimal,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

/// Admin order list filter
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    /// Case-insensitive order number fragment
    pub search: Option<String>,
}

/// Storage entry point
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Check the backend is reachable
    async fn ping(&self) -> AppResult<()>;

    /// Order with its items
    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>>;

    /// Orders of one customer, newest first, with the total count
    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<OrderWithItems>, u64)>;

    /// Orders matching `filter`, newest first, with the total count
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> AppResult<(Vec<OrderSummary>, u64)>;

    /// Ledger entries of a vegetable, newest first
    async fn inventory_logs(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<InventoryLog>>;

    /// Per-kg price changes of a vegetable, newest first
    async fn price_history(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<PriceHistory>>;

    /// Available vegetables at or below their alert threshold, lowest stock first
    async fn low_stock(&self, limit: u32) -> AppResult<Vec<LowStockItem>>;
}

/// One atomic unit of work
#[async_trait]
pub trait StoreTx: Send {
    /// Vegetables with their latest price, locked until commit.
    /// Missing ids are simply absent from the result.
    async fn lock_vegetables(&mut self, ids: &[Uuid]) -> AppResult<Vec<VegetableSnapshot>>;

    /// Subtract from stock, returning the new level
    async fn decrement_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal>;

    /// Add to stock, returning the new level
    async fn increment_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal>;

    /// Publish a new price record effective now
    async fn insert_price(&mut self, vegetable_id: Uuid, input: &SetPriceInput) -> AppResult<Price>;

    async fn append_price_history(
        &mut self,
        vegetable_id: Uuid,
        old_price: Option<Decimal>,
        new_price: Decimal,
    ) -> AppResult<PriceHistory>;

    /// Highest sequence issued under `day_prefix`. Holds a lock that keeps
    /// concurrent placements from reading the same value until commit.
    async fn max_order_sequence(&mut self, day_prefix: &str) -> AppResult<Option<u32>>;

    /// Insert an order and its items. A taken order number fails with
    /// `AppError::OrderNumberConflict`.
    async fn insert_order(&mut self, order: &NewOrder) -> AppResult<OrderWithItems>;

    /// Order with its items, locked until commit
    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<OrderWithItems>>;

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()>;

    async fn append_inventory_log(&mut self, entry: &NewInventoryLog) -> AppResult<InventoryLog>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
