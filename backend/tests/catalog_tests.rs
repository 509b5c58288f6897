//! Catalog maintenance tests
//!
//! Price publication with its audit trail, manual stock corrections and
//! the low-stock report.

mod common;

use common::{item, order, per_kg, Fixture};
use greengrocer_backend::AppError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{AdjustStockInput, ChangeType, SetPriceInput, Unit};
use uuid::Uuid;

// ============================================================================
// Prices
// ============================================================================

#[tokio::test]
async fn test_price_history_only_on_per_kg_change() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(10), per_kg(dec!(40))).await;

    // Same per-kg price, new piece price: no history entry
    fx.catalog
        .set_price(
            tomato,
            SetPriceInput {
                price_per_kg: Some(dec!(40)),
                price_per_piece: Some(dec!(8)),
                ..SetPriceInput::default()
            },
        )
        .await
        .unwrap();
    fx.catalog
        .set_price(tomato, per_kg(dec!(45)).unwrap())
        .await
        .unwrap();

    let history = fx.catalog.price_history(tomato).await.unwrap();
    assert_eq!(history.len(), 2);
    // Newest first
    assert_eq!(history[0].old_price, Some(dec!(40)));
    assert_eq!(history[0].new_price, dec!(45));
    assert_eq!(history[1].old_price, None);
    assert_eq!(history[1].new_price, dec!(40));
}

#[tokio::test]
async fn test_latest_price_record_wins() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(10), per_kg(dec!(40))).await;

    // The newest record has no per-kg price, so kg purchases stop
    fx.catalog
        .set_price(
            tomato,
            SetPriceInput {
                price_per_piece: Some(dec!(10)),
                ..SetPriceInput::default()
            },
        )
        .await
        .unwrap();

    let err = fx
        .orders
        .place_order(Uuid::new_v4(), order(vec![item(tomato, dec!(1), Unit::Kg)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnitNotSold { unit: Unit::Kg, .. }));
}

#[tokio::test]
async fn test_negative_price_rejected() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(10), per_kg(dec!(40))).await;

    let err = fx
        .catalog
        .set_price(tomato, per_kg(dec!(-1)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationErrors(_)));

    let err = fx
        .catalog
        .set_price(Uuid::new_v4(), per_kg(dec!(10)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Stock corrections
// ============================================================================

#[tokio::test]
async fn test_adjust_stock_logs_signed_delta() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(10), per_kg(dec!(40))).await;

    let down = fx
        .catalog
        .adjust_stock(
            tomato,
            AdjustStockInput {
                stock_kg: dec!(7.5),
                note: Some("Spoilage".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(down.previous_stock_kg, dec!(10));
    assert_eq!(down.stock_kg, dec!(7.5));
    let log = down.log.unwrap();
    assert_eq!(log.change_type, ChangeType::Adjustment);
    assert_eq!(log.quantity_kg, dec!(-2.5));
    assert_eq!(log.notes.as_deref(), Some("Spoilage"));

    let up = fx
        .catalog
        .adjust_stock(tomato, AdjustStockInput { stock_kg: dec!(20), note: None })
        .await
        .unwrap();
    assert_eq!(up.log.unwrap().quantity_kg, dec!(12.5));
    assert_eq!(fx.stock(tomato).await, dec!(20));

    let logs = fx.catalog.inventory_logs(tomato).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].quantity_kg, dec!(12.5));
}

#[tokio::test]
async fn test_adjust_stock_without_change_writes_no_log() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(10), per_kg(dec!(40))).await;

    let same = fx
        .catalog
        .adjust_stock(tomato, AdjustStockInput { stock_kg: dec!(10.000), note: None })
        .await
        .unwrap();

    assert!(same.log.is_none());
    assert!(fx.store.all_inventory_logs().await.is_empty());
}

#[tokio::test]
async fn test_adjust_stock_rejects_negative_level() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(10), per_kg(dec!(40))).await;

    let err = fx
        .catalog
        .adjust_stock(tomato, AdjustStockInput { stock_kg: dec!(-1), note: None })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationErrors(_)));
    assert_eq!(fx.stock(tomato).await, dec!(10));
}

// ============================================================================
// Low stock report
// ============================================================================

#[tokio::test]
async fn test_low_stock_lists_available_items_lowest_first() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(0.8), per_kg(dec!(40))).await;
    let onion = fx.vegetable("Onion", dec!(0.2), per_kg(dec!(35))).await;
    let _potato = fx.vegetable("Potato", dec!(50), per_kg(dec!(25))).await;
    let spinach = fx.vegetable("Spinach", Decimal::ZERO, per_kg(dec!(30))).await;
    fx.store.set_available(spinach, false).await.unwrap();

    let low = fx.catalog.low_stock().await.unwrap();
    let ids: Vec<Uuid> = low.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![onion, tomato]);
}

#[tokio::test]
async fn test_sale_below_threshold_shows_in_low_stock() {
    let fx = Fixture::new().await;
    let tomato = fx.vegetable("Tomato", dec!(3), per_kg(dec!(40))).await;
    assert!(fx.catalog.low_stock().await.unwrap().is_empty());

    fx.orders
        .place_order(Uuid::new_v4(), order(vec![item(tomato, dec!(2.5), Unit::Kg)]))
        .await
        .unwrap();

    let low = fx.catalog.low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].stock_kg, dec!(0.5));
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_category_names_are_unique() {
    let fx = Fixture::new().await;

    let err = fx.store.add_category("Leafy greens", 2).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "name"));

    let roots = fx.store.add_category("Roots", 2).await.unwrap();
    assert_eq!(roots.name, "Roots");
}
