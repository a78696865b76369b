//! Order model and related types.

mod events;
mod model;
mod state;
mod value_objects;

pub use events::OrderPlaced;
pub use model::{CommittedOrder, Order};
pub use state::OrderState;
pub use value_objects::{LineItem, Money, ParseMoneyError};

use thiserror::Error;

/// Errors raised while building an order from a placement request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Line item has an empty sku code.
    #[error("Sku code must not be empty")]
    EmptySku,

    /// Invalid quantity.
    #[error("Invalid quantity for {sku}: {quantity} (must be greater than 0)")]
    InvalidQuantity { sku: String, quantity: u32 },

    /// Negative unit price.
    #[error("Invalid price for {sku}: {price} (must not be negative)")]
    NegativePrice { sku: String, price: Money },

    /// A line total or the order total does not fit in the money range.
    #[error("Amount too large for {sku}: line or order total overflows")]
    AmountOverflow { sku: String },

    /// Unit price could not be parsed.
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] ParseMoneyError),
}
