//! WebAssembly module for the Greengrocer storefront
//!
//! Provides client-side computation for the cart page, using the same
//! pricing rules as the server:
//! - Line price preview
//! - Cart total preview
//! - Units a vegetable can be bought in

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::round_money;
use shared::{Price, PricingResolver, Unit};
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("greengrocer pricing module loaded"));
}

/// Priced cart line as shown to the shopper
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePreview {
    pub unit_price: Decimal,
    #[serde(serialize_with = "shared::money::serialize")]
    pub line_total: Decimal,
    pub stock_deduct_kg: Decimal,
}

/// Cart line as sent from the page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub price: Price,
    pub unit: Unit,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPreview {
    pub lines: Vec<LinePreview>,
    #[serde(serialize_with = "shared::money::serialize")]
    pub total: Decimal,
}

fn parse_price(price_json: &str) -> Result<Price, String> {
    serde_json::from_str(price_json).map_err(|e| format!("Invalid price JSON: {}", e))
}

fn parse_quantity(quantity: &str) -> Result<Decimal, String> {
    let quantity =
        Decimal::from_str(quantity).map_err(|e| format!("Invalid quantity: {}", e))?;
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero".to_string());
    }
    Ok(quantity)
}

fn price_line(price: &Price, unit: Unit, quantity: Decimal) -> Result<LinePreview, String> {
    let resolution = PricingResolver::default()
        .resolve(price, unit, quantity)
        .map_err(|e| e.to_string())?;
    Ok(LinePreview {
        unit_price: resolution.unit_price,
        line_total: resolution.line_total,
        stock_deduct_kg: resolution.stock_deduct_kg,
    })
}

fn preview_cart_lines(lines: &[CartLine]) -> Result<CartPreview, String> {
    let lines = lines
        .iter()
        .map(|l| price_line(&l.price, l.unit, l.quantity))
        .collect::<Result<Vec<_>, _>>()?;
    let total = lines.iter().map(|l| l.line_total).sum();
    Ok(CartPreview { lines, total })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// Price one cart line; returns `{unitPrice, lineTotal, stockDeductKg}` as JSON
#[wasm_bindgen]
pub fn preview_line(price_json: &str, unit: &str, quantity: &str) -> Result<String, JsValue> {
    let price = parse_price(price_json).map_err(|e| JsValue::from_str(&e))?;
    let unit = Unit::from_str(unit).map_err(|e| JsValue::from_str(&e))?;
    let quantity = parse_quantity(quantity).map_err(|e| JsValue::from_str(&e))?;
    price_line(&price, unit, quantity)
        .and_then(|line| to_json(&line))
        .map_err(|e| JsValue::from_str(&e))
}

/// Price a whole cart; returns `{lines, total}` as JSON
#[wasm_bindgen]
pub fn preview_cart(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<CartLine> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart JSON: {}", e)))?;
    preview_cart_lines(&lines)
        .and_then(|cart| to_json(&cart))
        .map_err(|e| JsValue::from_str(&e))
}

/// Units the price record allows, e.g. `["KG", "GRAM", "BUNCH"]`
#[wasm_bindgen]
pub fn available_units(price_json: &str) -> Result<js_sys::Array, JsValue> {
    let price = parse_price(price_json).map_err(|e| JsValue::from_str(&e))?;
    Ok(PricingResolver::default()
        .available_units(&price)
        .into_iter()
        .map(|unit| JsValue::from_str(unit.as_str()))
        .collect())
}

/// Round an amount to currency precision for display
#[wasm_bindgen]
pub fn format_money(amount: &str) -> Result<String, JsValue> {
    Decimal::from_str(amount)
        .map(|a| round_money(a).to_string())
        .map_err(|e| JsValue::from_str(&format!("Invalid amount: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOMATO: &str = r#"{
        "id": "7b0a4a52-2f4c-4c6e-9d57-6f0f8f1a0b01",
        "vegetableId": "0e9b1f2c-6a8d-4f0e-a5f4-3c2d1b0a9f8e",
        "pricePerKg": "40",
        "pricePerPiece": null,
        "pricePerPacket": null,
        "pricePerBundle": null,
        "packetWeight": null,
        "effectiveFrom": "2024-03-15T08:00:00Z"
    }"#;

    #[test]
    fn test_price_line_by_grams() {
        let price = parse_price(TOMATO).unwrap();
        let line = price_line(&price, Unit::Gram, Decimal::from(250)).unwrap();
        assert_eq!(line.line_total, Decimal::from(10));
        assert_eq!(to_json(&line).unwrap(), r#"{"unitPrice":"0.04","lineTotal":"10.00","stockDeductKg":"0.25"}"#);
    }

    #[test]
    fn test_unit_not_sold() {
        let price = parse_price(TOMATO).unwrap();
        assert!(price_line(&price, Unit::Piece, Decimal::ONE).is_err());
    }

    #[test]
    fn test_cart_total_is_sum_of_lines() {
        let price = parse_price(TOMATO).unwrap();
        let cart = preview_cart_lines(&[
            CartLine { price: price.clone(), unit: Unit::Kg, quantity: Decimal::from(2) },
            CartLine { price, unit: Unit::Gram, quantity: Decimal::from(125) },
        ])
        .unwrap();
        assert_eq!(cart.total, Decimal::from(85));
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("abc").is_err());
        assert_eq!(parse_quantity("1.5").unwrap(), Decimal::new(15, 1));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_available_units_for_per_kg_price() {
        let price = r#"{"id":"7b0a4a52-2f4c-4c6e-9d57-6f0f8f1a0b01","vegetableId":"0e9b1f2c-6a8d-4f0e-a5f4-3c2d1b0a9f8e","pricePerKg":"40","pricePerPiece":null,"pricePerPacket":null,"pricePerBundle":null,"packetWeight":null,"effectiveFrom":"2024-03-15T08:00:00Z"}"#;
        let units: Vec<String> = available_units(price)
            .unwrap()
            .iter()
            .filter_map(|v| v.as_string())
            .collect();
        assert_eq!(units, vec!["KG", "GRAM", "BUNCH"]);
    }

    #[wasm_bindgen_test]
    fn test_format_money_rounds_half_up() {
        assert_eq!(format_money("11.095").unwrap(), "11.10");
        assert!(format_money("eleven").is_err());
    }
}
