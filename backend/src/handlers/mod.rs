//! HTTP request handlers

pub mod admin_catalog;
pub mod admin_orders;
pub mod health;
pub mod orders;

pub use admin_catalog::*;
pub use admin_orders::*;
pub use health::*;
pub use orders::*;
