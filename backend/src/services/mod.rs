//! Business logic services for the Greengrocer storefront

pub mod catalog;
pub mod fulfillment;
pub mod order;

pub use catalog::CatalogService;
pub use fulfillment::FulfillmentService;
pub use order::{order_total, plan_order, OrderService, PlannedLine};
