//! Persistence layer for one tier's orders and inventory ledger.
//!
//! The [`TierStore`] trait is the single ACID boundary of the system: each
//! method runs as one transaction against the tier's own datastore, and
//! [`TierStore::apply_commit`] couples a status transition with its stock
//! effects atomically. Two implementations are provided:
//!
//! - [`MemoryTierStore`] for tests and local development
//! - [`PostgresTierStore`] backed by sqlx

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryTierStore;
pub use postgres::PostgresTierStore;
pub use store::{OrderCommit, TierStore};
