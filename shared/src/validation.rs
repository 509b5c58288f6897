//! Validation helpers for request bodies
//!
//! Inputs derive [`validator::Validate`]; the helpers here supply the
//! decimal checks and flatten `validator`'s nested report into a
//! field-level error list.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

/// One failing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flatten field errors, prefixing each field name with `prefix`
    pub fn collect(prefix: &str, errors: &ValidationErrors) -> Vec<FieldError> {
        let mut out: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    FieldError::new(format!("{}{}", prefix, field), message)
                })
            })
            .collect();
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut e = ValidationError::new(code);
    e.message = Some(Cow::Borrowed(message));
    e
}

/// Quantities must be strictly positive
pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(error("positive", "Must be greater than zero"))
    }
}

/// Largest quantity a single order line may request, in the line's own unit
pub const MAX_ORDER_QUANTITY: i64 = 100_000;

/// Order line quantities: positive and at most [`MAX_ORDER_QUANTITY`]
pub fn order_quantity(value: &Decimal) -> Result<(), ValidationError> {
    positive_decimal(value)?;
    if *value > Decimal::from(MAX_ORDER_QUANTITY) {
        return Err(error("max_quantity", "Must be at most 100000"));
    }
    Ok(())
}

/// Prices, weights and stock levels must not be negative
pub fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(error("non_negative", "Must not be negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdjustStockInput, SetPriceInput};
    use rust_decimal_macros::dec;
    use validator::Validate;

    #[test]
    fn test_positive_decimal() {
        assert!(positive_decimal(&dec!(0.001)).is_ok());
        assert!(positive_decimal(&Decimal::ZERO).is_err());
        assert!(positive_decimal(&dec!(-1)).is_err());
    }

    #[test]
    fn test_order_quantity_bounds() {
        assert!(order_quantity(&dec!(100000)).is_ok());
        assert!(order_quantity(&dec!(0.001)).is_ok());
        assert_eq!(order_quantity(&dec!(100000.001)).unwrap_err().code, "max_quantity");
        assert_eq!(order_quantity(&Decimal::MAX).unwrap_err().code, "max_quantity");
        assert_eq!(order_quantity(&Decimal::ZERO).unwrap_err().code, "positive");
    }

    #[test]
    fn test_non_negative_decimal() {
        assert!(non_negative_decimal(&Decimal::ZERO).is_ok());
        assert!(non_negative_decimal(&dec!(-0.01)).is_err());
    }

    #[test]
    fn test_set_price_rejects_negative_fields() {
        let input = SetPriceInput {
            price_per_kg: Some(dec!(-5)),
            packet_weight: Some(dec!(-1)),
            ..SetPriceInput::default()
        };
        let errors = FieldError::collect("", &input.validate().unwrap_err());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["packet_weight", "price_per_kg"]);
        assert_eq!(errors[0].message, "Must not be negative");
    }

    #[test]
    fn test_adjust_stock_accepts_zero() {
        let input = AdjustStockInput {
            stock_kg: Decimal::ZERO,
            note: None,
        };
        assert!(input.validate().is_ok());
    }
}
