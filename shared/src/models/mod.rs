//! Domain models for the Greengrocer storefront

mod catalog;
mod inventory;
mod order;

pub use catalog::*;
pub use inventory::*;
pub use order::*;
