//! Shared types and domain rules for the Greengrocer storefront
//!
//! This crate contains the models, pricing rules and order-number format
//! shared between the backend and the browser (via WASM).

pub mod models;
pub mod money;
pub mod pricing;
pub mod sequence;
pub mod types;
pub mod validation;

pub use models::*;
pub use pricing::*;
pub use sequence::*;
pub use types::*;
pub use validation::*;
