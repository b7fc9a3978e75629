use common::AggregateId;
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when reading or writing orders.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("Order not found: {0}")]
    NotFound(AggregateId),

    #[error("Order already exists: {0}")]
    AlreadyExists(AggregateId),

    /// A stored record could not be turned back into an order.
    #[error("Corrupt order record: {0}")]
    Corrupt(#[from] OrderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
