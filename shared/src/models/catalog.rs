//! Catalog models: categories, vegetables and time-versioned prices

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::InventoryLog;
use crate::validation::non_negative_decimal;

/// A product category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub name_hindi: Option<String>,
    pub name_kannada: Option<String>,
    pub sort_order: i32,
}

/// A vegetable offered in the store
///
/// `stock_kg` is the single source of truth for remaining inventory,
/// expressed in kilograms whatever unit the vegetable is sold in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vegetable {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub name_hindi: Option<String>,
    pub name_kannada: Option<String>,
    pub emoji: Option<String>,
    pub image: Option<String>,
    pub available: bool,
    pub stock_kg: Decimal,
    pub min_stock_alert: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A price record for a vegetable
///
/// Every per-unit price is optional; a vegetable can only be bought in a
/// unit whose price is present. The record with the latest
/// `effective_from` is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub id: Uuid,
    pub vegetable_id: Uuid,
    pub price_per_kg: Option<Decimal>,
    pub price_per_piece: Option<Decimal>,
    pub price_per_packet: Option<Decimal>,
    pub price_per_bundle: Option<Decimal>,
    /// Kilograms per packet, used to convert packet counts to stock
    pub packet_weight: Option<Decimal>,
    pub effective_from: DateTime<Utc>,
}

/// Audit record of a per-kg price change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    pub id: Uuid,
    pub vegetable_id: Uuid,
    pub old_price: Option<Decimal>,
    pub new_price: Decimal,
    pub changed_at: DateTime<Utc>,
}

/// Vegetable state as seen by the order engine inside a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VegetableSnapshot {
    pub id: Uuid,
    pub name: String,
    pub available: bool,
    pub stock_kg: Decimal,
    pub min_stock_alert: Decimal,
    pub latest_price: Option<Price>,
}

/// Vegetable at or below its stock alert threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub stock_kg: Decimal,
    pub min_stock_alert: Decimal,
}

/// Outcome of a manual stock correction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub vegetable_id: Uuid,
    pub previous_stock_kg: Decimal,
    pub stock_kg: Decimal,
    /// Absent when the stock did not change
    pub log: Option<InventoryLog>,
}

/// Input for publishing a new price record
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceInput {
    #[validate(custom = "non_negative_decimal")]
    pub price_per_kg: Option<Decimal>,
    #[validate(custom = "non_negative_decimal")]
    pub price_per_piece: Option<Decimal>,
    #[validate(custom = "non_negative_decimal")]
    pub price_per_packet: Option<Decimal>,
    #[validate(custom = "non_negative_decimal")]
    pub price_per_bundle: Option<Decimal>,
    #[validate(custom = "non_negative_decimal")]
    pub packet_weight: Option<Decimal>,
}

/// Input for a manual stock correction
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockInput {
    #[validate(custom = "non_negative_decimal")]
    pub stock_kg: Decimal,
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}
