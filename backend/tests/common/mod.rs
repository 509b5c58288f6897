//! Shared fixtures for the integration tests

#![allow(dead_code)]

pub mod recording;

use std::sync::Arc;

use greengrocer_backend::{
    config::Config,
    services::{CatalogService, FulfillmentService, OrderService},
    store::{memory::NewVegetable, MemoryStore, Store},
    AppState,
};
use rust_decimal::Decimal;
use shared::{OrderItemInput, PlaceOrderInput, SetPriceInput, Unit};
use uuid::Uuid;

use recording::RecordingStore;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub config: Arc<Config>,
    pub orders: OrderService,
    pub fulfillment: FulfillmentService,
    pub catalog: CatalogService,
    category_id: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(Config::in_memory(JWT_SECRET));
        let dyn_store: Arc<dyn Store> = store.clone();
        let category = store.add_category("Leafy greens", 1).await.unwrap();

        Self {
            orders: OrderService::new(dyn_store.clone(), config.clone()),
            fulfillment: FulfillmentService::new(dyn_store.clone(), config.clone()),
            catalog: CatalogService::new(dyn_store),
            store,
            config,
            category_id: category.id,
        }
    }

    pub fn app_state(&self) -> AppState {
        let store: Arc<dyn Store> = self.store.clone();
        AppState {
            store,
            config: self.config.clone(),
        }
    }

    /// Add a vegetable with `stock_kg` and, if given, an initial price
    pub async fn vegetable(&self, name: &str, stock_kg: Decimal, price: Option<SetPriceInput>) -> Uuid {
        let vegetable = self
            .store
            .add_vegetable(NewVegetable {
                category_id: self.category_id,
                name: name.to_string(),
                emoji: None,
                available: true,
                stock_kg,
                min_stock_alert: Decimal::ONE,
            })
            .await
            .unwrap();
        if let Some(price) = price {
            self.catalog.set_price(vegetable.id, price).await.unwrap();
        }
        vegetable.id
    }

    /// Services over a recording view of the same store, allowing
    /// `max_number_retries` attempts per placement
    pub fn recorded(&self, max_number_retries: u32) -> Recorded {
        let mut config = (*self.config).clone();
        config.orders.max_number_retries = max_number_retries;
        let config = Arc::new(config);
        let store = RecordingStore::new((*self.store).clone());
        let dyn_store: Arc<dyn Store> = Arc::new(store.clone());
        Recorded {
            orders: OrderService::new(dyn_store.clone(), config.clone()),
            fulfillment: FulfillmentService::new(dyn_store, config),
            store,
        }
    }

    pub async fn stock(&self, vegetable_id: Uuid) -> Decimal {
        self.store.vegetable(vegetable_id).await.unwrap().stock_kg
    }
}

pub struct Recorded {
    pub store: RecordingStore,
    pub orders: OrderService,
    pub fulfillment: FulfillmentService,
}

pub fn per_kg(amount: Decimal) -> Option<SetPriceInput> {
    Some(SetPriceInput {
        price_per_kg: Some(amount),
        ..SetPriceInput::default()
    })
}

pub fn item(vegetable_id: Uuid, quantity: Decimal, unit: Unit) -> OrderItemInput {
    OrderItemInput {
        vegetable_id,
        quantity,
        unit,
    }
}

pub fn order(items: Vec<OrderItemInput>) -> PlaceOrderInput {
    PlaceOrderInput {
        items,
        address: Some("12 MG Road, Bengaluru".to_string()),
        notes: None,
    }
}
