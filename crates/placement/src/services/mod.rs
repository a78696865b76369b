//! Inventory lookup port and its adapters.

pub mod http;
pub mod inventory;

pub use http::HttpInventoryLookup;
pub use inventory::{InMemoryInventoryLookup, InventoryLookup};
