//! Order entity and related types.

mod entity;
mod status;
mod value_objects;

pub use entity::Order;
pub use status::OrderStatus;
pub use value_objects::{LineItem, Money, ProductId};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How an order came into existence on this tier.
///
/// `Local` orders were originated here (a customer order at the seller, a
/// replenishment order at the distributor). `Peer` orders were created by an
/// upstream tier's forwarding call and carry the caller's order number as
/// counterparty. At the distributor this reproduces the FromSeller (`Peer`)
/// vs FromManufacturer (`Local`) distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderOrigin {
    Local,
    Peer,
}

impl OrderOrigin {
    /// Returns the origin name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOrigin::Local => "Local",
            OrderOrigin::Peer => "Peer",
        }
    }

    /// Parses an origin from its name.
    pub fn parse(s: &str) -> Option<OrderOrigin> {
        match s {
            "Local" => Some(OrderOrigin::Local),
            "Peer" => Some(OrderOrigin::Peer),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is not in a state that permits the attempted action.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// An order must carry at least one line item.
    #[error("Order has no line items")]
    NoLineItems,

    /// Line quantity must be greater than zero.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Unit price must be greater than zero.
    #[error("Invalid unit price: {cents} cents (must be greater than 0)")]
    InvalidPrice { cents: i64 },
}
