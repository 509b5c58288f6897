//! Order models and the order status state machine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{order_quantity, FieldError};

/// Unit a customer buys a vegetable in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Kg,
    Gram,
    Piece,
    Packet,
    Bundle,
    Bunch,
}

impl Unit {
    pub const ALL: [Unit; 6] = [
        Unit::Kg,
        Unit::Gram,
        Unit::Piece,
        Unit::Packet,
        Unit::Bundle,
        Unit::Bunch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "KG",
            Unit::Gram => "GRAM",
            Unit::Piece => "PIECE",
            Unit::Packet => "PACKET",
            Unit::Bundle => "BUNDLE",
            Unit::Bunch => "BUNCH",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| format!("unknown unit: {}", s))
    }
}

/// Order lifecycle status
///
/// `Pending -> Confirmed -> OutForDelivery -> Delivered`, one step at a
/// time, with `Cancelled` reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot update a {} order", .0.as_str().to_lowercase())]
    Terminal(OrderStatus),

    #[error("Cannot move order from {from} to {to}")]
    Invalid { from: OrderStatus, to: OrderStatus },
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Delivered and cancelled orders accept no further status change
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The single forward step from this status, if any
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Check that moving to `to` is allowed
    pub fn check_transition(&self, to: OrderStatus) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(*self));
        }
        if to == OrderStatus::Cancelled || self.next() == Some(to) {
            Ok(())
        } else {
            Err(TransitionError::Invalid { from: *self, to })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {}", s))
    }
}

/// A placed order
///
/// `total_amount` is the sum of the item totals at creation time and is
/// never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    #[serde(serialize_with = "crate::money::serialize")]
    pub total_amount: Decimal,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order with its frozen price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vegetable_id: Uuid,
    /// Quantity in the unit the customer chose
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_price: Decimal,
    #[serde(serialize_with = "crate::money::serialize")]
    pub total_price: Decimal,
}

/// Order with its line items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Sum of the frozen line totals
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

/// Order row for admin listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: i64,
}

/// A requested line of a new order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub vegetable_id: Uuid,
    #[validate(custom = "order_quantity")]
    pub quantity: Decimal,
    pub unit: Unit,
}

/// Request body for placing an order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderInput {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItemInput>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl PlaceOrderInput {
    /// Validate the request and every line, collecting field-level errors
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.validate() {
            errors.extend(FieldError::collect("", &e));
        }
        for (idx, item) in self.items.iter().enumerate() {
            if let Err(e) = item.validate() {
                errors.extend(FieldError::collect(&format!("items[{}].", idx), &e));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request body for an order status change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
}
