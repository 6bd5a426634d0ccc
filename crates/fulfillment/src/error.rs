//! Fulfillment error taxonomy.

use common::{OrderId, OrderNumber};
use domain::{OrderError, OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the tier order service.
///
/// Everything here aborts the local transaction and is reported to the
/// caller as a structured failure; the one deliberate exception is
/// notification failure after an accept, which is logged and swallowed
/// inside the service and never reaches this type.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// No order with this ID on this tier.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No order with this order number on this tier.
    #[error("Order not found: {0}")]
    OrderNumberNotFound(OrderNumber),

    /// A line item references a product unknown to this tier.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A line item references a deactivated product.
    #[error("Product is inactive: {0}")]
    ProductInactive(ProductId),

    /// The order's status does not permit the attempted transition.
    #[error("Invalid transition: cannot {action} from {current} state")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// A line item cannot be covered by current stock. Nothing was applied.
    #[error(
        "Insufficient stock for {product_id}: available {available}, required {required}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        required: i64,
    },

    /// The upstream tier refused or failed the forwarding call; the local
    /// order was not created.
    #[error("Upstream rejected order: {0}")]
    UpstreamRejected(String),

    /// Order-level validation failure (empty order, zero quantity, ...).
    #[error("Invalid order: {0}")]
    Validation(OrderError),

    /// Storage error not covered by a more specific variant.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for FulfillmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => FulfillmentError::OrderNotFound(id),
            StoreError::ProductNotFound(sku) => FulfillmentError::ProductNotFound(sku),
            StoreError::InsufficientStock {
                product_id,
                available,
                required,
            } => FulfillmentError::InsufficientStock {
                product_id,
                available,
                required,
            },
            StoreError::Transition(OrderError::InvalidTransition { current, action }) => {
                FulfillmentError::InvalidTransition { current, action }
            }
            other => FulfillmentError::Store(other),
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { current, action } => {
                FulfillmentError::InvalidTransition { current, action }
            }
            other => FulfillmentError::Validation(other),
        }
    }
}

/// Result type for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
