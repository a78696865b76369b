//! Shared identifier types used across the order placement services.

mod types;

pub use types::{OrderNumber, SkuCode};
