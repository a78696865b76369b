use common::OrderNumber;
use thiserror::Error;

/// Errors that can occur when reading or writing orders.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this number has already been stored.
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderNumber),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row holds a value the domain cannot represent.
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    /// The store refused the write (used by test doubles and read-only stores).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
