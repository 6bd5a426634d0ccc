//! Shared types used across every tier crate.

pub mod types;

pub use types::{OrderId, OrderNumber, Tier};
