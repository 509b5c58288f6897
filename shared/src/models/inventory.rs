//! Inventory ledger models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Stock leaving with an order (negative quantity)
    Sale,
    /// Restoration on cancellation or a manual correction
    Adjustment,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Sale => "SALE",
            ChangeType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SALE" => Ok(ChangeType::Sale),
            "ADJUSTMENT" => Ok(ChangeType::Adjustment),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// Append-only ledger entry for a stock movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLog {
    pub id: Uuid,
    pub vegetable_id: Uuid,
    pub order_id: Option<Uuid>,
    pub change_type: ChangeType,
    /// Signed kilograms: negative for sales, positive for restorations
    pub quantity_kg: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry about to be appended
#[derive(Debug, Clone)]
pub struct NewInventoryLog {
    pub vegetable_id: Uuid,
    pub order_id: Option<Uuid>,
    pub change_type: ChangeType,
    pub quantity_kg: Decimal,
    pub notes: Option<String>,
}

impl NewInventoryLog {
    /// Sale of `deducted_kg` for an order
    pub fn sale(vegetable_id: Uuid, order_id: Uuid, order_number: &str, deducted_kg: Decimal) -> Self {
        Self {
            vegetable_id,
            order_id: Some(order_id),
            change_type: ChangeType::Sale,
            quantity_kg: -deducted_kg,
            notes: Some(format!("Order {}", order_number)),
        }
    }

    /// Manual stock correction by `delta_kg`
    pub fn adjustment(vegetable_id: Uuid, delta_kg: Decimal, note: Option<String>) -> Self {
        Self {
            vegetable_id,
            order_id: None,
            change_type: ChangeType::Adjustment,
            quantity_kg: delta_kg,
            notes: Some(note.unwrap_or_else(|| "Manual stock adjustment".to_string())),
        }
    }

    /// Restoration of `restored_kg` for a cancelled order
    pub fn cancellation(
        vegetable_id: Uuid,
        order_id: Uuid,
        order_number: &str,
        restored_kg: Decimal,
    ) -> Self {
        Self {
            vegetable_id,
            order_id: Some(order_id),
            change_type: ChangeType::Adjustment,
            quantity_kg: restored_kg,
            notes: Some(format!("Cancelled order {}", order_number)),
        }
    }
}
