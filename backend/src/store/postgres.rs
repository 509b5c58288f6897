//! PostgreSQL store
//!
//! Transactions run at READ COMMITTED. Vegetable and order rows are locked
//! with `SELECT ... FOR UPDATE`, vegetables in ascending id order so two
//! placements touching the same vegetables cannot deadlock. Order numbers
//! of one day are serialised with a transaction-scoped advisory lock; the
//! unique index on `order_number` backs it up.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    InventoryLog, LowStockItem, NewInventoryLog, Order, OrderItem, OrderStatus, OrderSummary,
    OrderWithItems, Page, Price, PriceHistory, SetPriceInput, VegetableSnapshot,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{NewOrder, OrderFilter, Store, StoreTx};
use crate::error::{AppError, AppResult};

const UNIQUE_VIOLATION: &str = "23505";

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, total_amount, address, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, vegetable_id, quantity, unit, unit_price, total_price";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_id: Uuid,
    status: String,
    total_amount: Decimal,
    address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    item_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    vegetable_id: Uuid,
    quantity: Decimal,
    unit: String,
    unit_price: Decimal,
    total_price: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: Uuid,
    vegetable_id: Uuid,
    price_per_kg: Option<Decimal>,
    price_per_piece: Option<Decimal>,
    price_per_packet: Option<Decimal>,
    price_per_bundle: Option<Decimal>,
    packet_weight: Option<Decimal>,
    effective_from: DateTime<Utc>,
}

/// Locked vegetable joined with its latest price, if any
#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    name: String,
    available: bool,
    stock_kg: Decimal,
    min_stock_alert: Decimal,
    price_id: Option<Uuid>,
    price_per_kg: Option<Decimal>,
    price_per_piece: Option<Decimal>,
    price_per_packet: Option<Decimal>,
    price_per_bundle: Option<Decimal>,
    packet_weight: Option<Decimal>,
    effective_from: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct InventoryLogRow {
    id: Uuid,
    vegetable_id: Uuid,
    order_id: Option<Uuid>,
    change_type: String,
    quantity_kg: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_column<T: FromStr<Err = String>>(value: &str) -> AppResult<T> {
    value.parse().map_err(AppError::Internal)
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> AppResult<Self> {
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            status: parse_column(&row.status)?,
            total_amount: row.total_amount,
            address: row.address,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = AppError;

    fn try_from(row: OrderItemRow) -> AppResult<Self> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            vegetable_id: row.vegetable_id,
            quantity: row.quantity,
            unit: parse_column(&row.unit)?,
            unit_price: row.unit_price,
            total_price: row.total_price,
        })
    }
}

impl From<PriceRow> for Price {
    fn from(row: PriceRow) -> Self {
        Price {
            id: row.id,
            vegetable_id: row.vegetable_id,
            price_per_kg: row.price_per_kg,
            price_per_piece: row.price_per_piece,
            price_per_packet: row.price_per_packet,
            price_per_bundle: row.price_per_bundle,
            packet_weight: row.packet_weight,
            effective_from: row.effective_from,
        }
    }
}

impl From<SnapshotRow> for VegetableSnapshot {
    fn from(row: SnapshotRow) -> Self {
        let latest_price = match (row.price_id, row.effective_from) {
            (Some(id), Some(effective_from)) => Some(Price {
                id,
                vegetable_id: row.id,
                price_per_kg: row.price_per_kg,
                price_per_piece: row.price_per_piece,
                price_per_packet: row.price_per_packet,
                price_per_bundle: row.price_per_bundle,
                packet_weight: row.packet_weight,
                effective_from,
            }),
            _ => None,
        };
        VegetableSnapshot {
            id: row.id,
            name: row.name,
            available: row.available,
            stock_kg: row.stock_kg,
            min_stock_alert: row.min_stock_alert,
            latest_price,
        }
    }
}

impl TryFrom<InventoryLogRow> for InventoryLog {
    type Error = AppError;

    fn try_from(row: InventoryLogRow) -> AppResult<Self> {
        Ok(InventoryLog {
            id: row.id,
            vegetable_id: row.vegetable_id,
            order_id: row.order_id,
            change_type: parse_column(&row.change_type)?,
            quantity_kg: row.quantity_kg,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Attach items to orders, keeping the order of `orders`
fn assemble(orders: Vec<OrderRow>, items: Vec<OrderItemRow>) -> AppResult<Vec<OrderWithItems>> {
    let items = items
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    orders
        .into_iter()
        .map(|row| {
            let order = Order::try_from(row)?;
            let items = items.iter().filter(|i| i.order_id == order.id).cloned().collect();
            Ok(OrderWithItems { order, items })
        })
        .collect()
}

async fn fetch_items<'e, E>(executor: E, order_ids: &[Uuid]) -> AppResult<Vec<OrderItemRow>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
        "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
        ITEM_COLUMNS
    ))
    .bind(order_ids)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

fn search_pattern(search: &Option<String>) -> Option<String> {
    search.as_ref().map(|s| {
        let escaped = s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = fetch_items(&self.db, &[row.id]).await?;
        Ok(assemble(vec![row], items)?.pop())
    }

    async fn list_customer_orders(
        &self,
        customer_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<OrderWithItems>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {} FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC, order_number DESC
            LIMIT $2 OFFSET $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = fetch_items(&self.db, &ids).await?;
        Ok((assemble(rows, items)?, total as u64))
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> AppResult<(Vec<OrderSummary>, u64)> {
        let status = filter.status.map(|s| s.as_str());
        let pattern = search_pattern(&filter.search);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders o
            WHERE ($1::uuid IS NULL OR o.customer_id = $1)
              AND ($2::text IS NULL OR o.status = $2)
              AND ($3::text IS NULL OR o.order_number ILIKE $3)
            "#,
        )
        .bind(filter.customer_id)
        .bind(status)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r#"
            SELECT o.id, o.order_number, o.customer_id, o.status, o.total_amount,
                   o.address, o.notes, o.created_at, o.updated_at,
                   (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count
            FROM orders o
            WHERE ($1::uuid IS NULL OR o.customer_id = $1)
              AND ($2::text IS NULL OR o.status = $2)
              AND ($3::text IS NULL OR o.order_number ILIKE $3)
            ORDER BY o.created_at DESC, o.order_number DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.customer_id)
        .bind(status)
        .bind(&pattern)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let orders = rows
            .into_iter()
            .map(|row| {
                Ok(OrderSummary {
                    order: Order::try_from(row.order)?,
                    item_count: row.item_count,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok((orders, total as u64))
    }

    async fn inventory_logs(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<InventoryLog>> {
        let rows = sqlx::query_as::<_, InventoryLogRow>(
            r#"
            SELECT id, vegetable_id, order_id, change_type, quantity_kg, notes, created_at
            FROM inventory_logs
            WHERE vegetable_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(vegetable_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryLog::try_from).collect()
    }

    async fn price_history(&self, vegetable_id: Uuid, limit: u32) -> AppResult<Vec<PriceHistory>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Option<Decimal>, Decimal, DateTime<Utc>)>(
            r#"
            SELECT id, vegetable_id, old_price, new_price, changed_at
            FROM price_history
            WHERE vegetable_id = $1
            ORDER BY changed_at DESC
            LIMIT $2
            "#,
        )
        .bind(vegetable_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, vegetable_id, old_price, new_price, changed_at)| PriceHistory {
                id,
                vegetable_id,
                old_price,
                new_price,
                changed_at,
            })
            .collect())
    }

    async fn low_stock(&self, limit: u32) -> AppResult<Vec<LowStockItem>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, Decimal, Decimal)>(
            r#"
            SELECT id, name, emoji, stock_kg, min_stock_alert
            FROM vegetables
            WHERE available = TRUE AND stock_kg <= min_stock_alert
            ORDER BY stock_kg ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, emoji, stock_kg, min_stock_alert)| LowStockItem {
                id,
                name,
                emoji,
                stock_kg,
                min_stock_alert,
            })
            .collect())
    }
}

struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_vegetables(&mut self, ids: &[Uuid]) -> AppResult<Vec<VegetableSnapshot>> {
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.dedup();

        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT v.id, v.name, v.available, v.stock_kg, v.min_stock_alert,
                   p.id AS price_id, p.price_per_kg, p.price_per_piece, p.price_per_packet,
                   p.price_per_bundle, p.packet_weight, p.effective_from
            FROM vegetables v
            LEFT JOIN LATERAL (
                SELECT * FROM prices
                WHERE prices.vegetable_id = v.id
                ORDER BY effective_from DESC
                LIMIT 1
            ) p ON TRUE
            WHERE v.id = ANY($1)
            ORDER BY v.id
            FOR UPDATE OF v
            "#,
        )
        .bind(&sorted)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(VegetableSnapshot::from).collect())
    }

    async fn decrement_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            "UPDATE vegetables SET stock_kg = stock_kg - $2, updated_at = NOW() WHERE id = $1 RETURNING stock_kg",
        )
        .bind(vegetable_id)
        .bind(amount_kg)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Vegetable".to_string()))
    }

    async fn increment_stock(&mut self, vegetable_id: Uuid, amount_kg: Decimal) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            "UPDATE vegetables SET stock_kg = stock_kg + $2, updated_at = NOW() WHERE id = $1 RETURNING stock_kg",
        )
        .bind(vegetable_id)
        .bind(amount_kg)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Vegetable".to_string()))
    }

    async fn insert_price(&mut self, vegetable_id: Uuid, input: &SetPriceInput) -> AppResult<Price> {
        let row = sqlx::query_as::<_, PriceRow>(
            r#"
            INSERT INTO prices (id, vegetable_id, price_per_kg, price_per_piece, price_per_packet,
                                price_per_bundle, packet_weight, effective_from)
            VALUES ($1, $2, $3, $4, $5, $6, $7, clock_timestamp())
            RETURNING id, vegetable_id, price_per_kg, price_per_piece, price_per_packet,
                      price_per_bundle, packet_weight, effective_from
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vegetable_id)
        .bind(input.price_per_kg)
        .bind(input.price_per_piece)
        .bind(input.price_per_packet)
        .bind(input.price_per_bundle)
        .bind(input.packet_weight)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn append_price_history(
        &mut self,
        vegetable_id: Uuid,
        old_price: Option<Decimal>,
        new_price: Decimal,
    ) -> AppResult<PriceHistory> {
        let (id, changed_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO price_history (id, vegetable_id, old_price, new_price, changed_at)
            VALUES ($1, $2, $3, $4, clock_timestamp())
            RETURNING id, changed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vegetable_id)
        .bind(old_price)
        .bind(new_price)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(PriceHistory {
            id,
            vegetable_id,
            old_price,
            new_price,
            changed_at,
        })
    }

    async fn max_order_sequence(&mut self, day_prefix: &str) -> AppResult<Option<u32>> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(day_prefix)
            .execute(&mut *self.tx)
            .await?;

        // Numeric comparison, so 1000 sorts after 999
        let start = day_prefix.chars().count() as i32 + 1;
        let highest: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT MAX(CAST(substring(order_number FROM $2) AS INTEGER))
            FROM orders
            WHERE order_number LIKE $1 || '%'
              AND substring(order_number FROM $2) ~ '^[0-9]+$'
            "#,
        )
        .bind(day_prefix)
        .bind(start)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(highest.and_then(|n| u32::try_from(n).ok()))
    }

    async fn insert_order(&mut self, new: &NewOrder) -> AppResult<OrderWithItems> {
        let order_id = Uuid::new_v4();
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (id, order_number, customer_id, status, total_amount, address, notes,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, clock_timestamp(), clock_timestamp())
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(&new.order_number)
        .bind(new.customer_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(new.total_amount)
        .bind(&new.address)
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::OrderNumberConflict(new.order_number.clone())
            } else {
                AppError::DatabaseError(e)
            }
        })?;

        let mut items = Vec::with_capacity(new.items.len());
        for (position, item) in new.items.iter().enumerate() {
            let item_row = sqlx::query_as::<_, OrderItemRow>(&format!(
                r#"
                INSERT INTO order_items (id, order_id, position, vegetable_id, quantity, unit,
                                         unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(position as i32)
            .bind(item.vegetable_id)
            .bind(item.quantity)
            .bind(item.unit.as_str())
            .bind(item.unit_price)
            .bind(item.total_price)
            .fetch_one(&mut *self.tx)
            .await?;
            items.push(OrderItem::try_from(item_row)?);
        }

        Ok(OrderWithItems {
            order: Order::try_from(row)?,
            items,
        })
    }

    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = fetch_items(&mut *self.tx, &[row.id]).await?;
        Ok(assemble(vec![row], items)?.pop())
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order".to_string()));
        }
        Ok(())
    }

    async fn append_inventory_log(&mut self, entry: &NewInventoryLog) -> AppResult<InventoryLog> {
        let row = sqlx::query_as::<_, InventoryLogRow>(
            r#"
            INSERT INTO inventory_logs (id, vegetable_id, order_id, change_type, quantity_kg, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp())
            RETURNING id, vegetable_id, order_id, change_type, quantity_kg, notes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.vegetable_id)
        .bind(entry.order_id)
        .bind(entry.change_type.as_str())
        .bind(entry.quantity_kg)
        .bind(&entry.notes)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
