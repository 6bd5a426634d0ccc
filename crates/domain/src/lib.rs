//! Domain layer for the tier order system.
//!
//! This crate provides the pure domain model shared by every tier:
//! - Order entity with its lifecycle state machine
//! - Line items and money value objects
//! - Inventory ledger entry (product) and append-only transaction log types
//!
//! No IO lives here; persistence and cross-tier calls are layered on top.

pub mod inventory;
pub mod order;

pub use inventory::{
    InventoryTransaction, Product, StockMovement, TransactionKind, replayed_stock,
};
pub use order::{LineItem, Money, Order, OrderError, OrderOrigin, OrderStatus, ProductId};
