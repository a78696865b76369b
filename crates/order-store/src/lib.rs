//! Persistence for committed orders.
//!
//! Every implementation writes an order together with all of its line items
//! as one atomic unit: either the whole order is stored or none of it is.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;
pub use store::OrderRepository;
