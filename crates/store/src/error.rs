use common::{OrderId, OrderNumber};
use domain::{OrderError, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with a tier store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order with the given ID exists on this tier.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this order number already exists.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(OrderNumber),

    /// A referenced product is unknown to this tier's ledger.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A stock decrement would drive `current_stock` negative.
    /// Nothing was applied.
    #[error(
        "Insufficient stock for {product_id}: available {available}, required {required}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        required: i64,
    },

    /// The order's state machine rejected the requested transition.
    #[error(transparent)]
    Transition(#[from] OrderError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
