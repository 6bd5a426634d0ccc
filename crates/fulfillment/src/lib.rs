//! Cross-tier order coordination.
//!
//! This crate owns the heart of the system: the [`TierOrderService`] state
//! machine that validates status transitions, triggers inventory ledger
//! mutations, and drives the two cross-tier mechanisms:
//!
//! 1. Forwarding — order creation on this tier synchronously creates the
//!    counterpart order on the upstream tier through the [`PeerGateway`];
//!    if the upstream refuses, no local order exists.
//! 2. Acceptance notification — after a local accept commits, the
//!    [`AcceptanceNotifier`] fires a one-shot callback to the tier that
//!    originated the order. The callback is fire-and-forget: failure is
//!    logged and swallowed, never reverting the committed accept.

pub mod error;
pub mod gateway;
pub mod notifier;
pub mod service;

pub use error::FulfillmentError;
pub use gateway::{
    ForwardLine, ForwardOrderRequest, GatewayError, HttpPeerGateway, InMemoryPeerGateway,
    PeerGateway, PeerOrderAck, ServiceAuth,
};
pub use notifier::{
    API_KEY_HEADER, AcceptanceNotifier, DisabledNotifier, HttpAcceptanceNotifier,
    InMemoryAcceptanceNotifier, NotifyError,
};
pub use service::{NewOrder, NewOrderLine, StockCheck, TierOrderService};
