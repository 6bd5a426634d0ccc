//! Inventory ledger types: products, stock movements, and the append-only
//! transaction log.

use chrono::{DateTime, Utc};
use common::OrderNumber;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{Money, ProductId};

/// Inventory ledger entry for one product on one tier.
///
/// `current_stock` is mutated only by accepted-order processing or explicit
/// stock adjustments; products are never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// SKU; also the cross-tier join key.
    pub sku: ProductId,

    /// Human-readable product name.
    pub name: String,

    /// This tier's own price for the product. Totals are always computed
    /// from this, never from caller-supplied prices.
    pub unit_price: Money,

    /// Physical units on hand.
    pub current_stock: i64,

    /// Units promised to others.
    pub reserved_stock: i64,

    /// Advisory minimum stock level (distributor/manufacturer).
    pub min_stock_level: Option<i64>,

    /// Advisory threshold below which replenishment is suggested.
    pub reorder_point: Option<i64>,

    /// Suggested replenishment quantity once below the reorder point.
    pub reorder_quantity: Option<i64>,

    /// Deactivated products stay on the ledger but take no new orders.
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new active product with the given starting stock.
    pub fn new(
        sku: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        initial_stock: i64,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            unit_price,
            current_stock: initial_stock,
            reserved_stock: 0,
            min_stock_level: None,
            reorder_point: None,
            reorder_quantity: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Attaches the advisory reorder thresholds.
    pub fn with_reorder_policy(mut self, min_level: i64, point: i64, quantity: i64) -> Self {
        self.min_stock_level = Some(min_level);
        self.reorder_point = Some(point);
        self.reorder_quantity = Some(quantity);
        self
    }

    /// Units eligible for new commitments: `current_stock - reserved_stock`.
    /// Derived, never stored.
    pub fn available_stock(&self) -> i64 {
        self.current_stock - self.reserved_stock
    }

    /// Advisory replenishment signal: `current_stock <= reorder_point`.
    /// Consumed by reporting only, never enforced.
    pub fn needs_reorder(&self) -> bool {
        self.reorder_point
            .map(|point| self.current_stock <= point)
            .unwrap_or(false)
    }
}

/// Direction of an inventory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Stock received (replenishment arriving).
    In,
    /// Stock shipped out (accepted order).
    Out,
}

impl TransactionKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::In => "IN",
            TransactionKind::Out => "OUT",
        }
    }

    /// Parses a kind from its name.
    pub fn parse(s: &str) -> Option<TransactionKind> {
        match s {
            "IN" => Some(TransactionKind::In),
            "OUT" => Some(TransactionKind::Out),
            _ => None,
        }
    }

    /// The signed stock delta for a quantity moved in this direction.
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            TransactionKind::In => quantity,
            TransactionKind::Out => -quantity,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only audit record of one stock mutation.
///
/// The log is the only source of truth for why stock looks the way it does:
/// exactly one entry is written per affected line item per accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub product_id: ProductId,
    pub kind: TransactionKind,
    pub quantity: i64,
    /// The order number that caused this mutation.
    pub reference: OrderNumber,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryTransaction {
    /// Records a new transaction stamped with the current time.
    pub fn record(
        product_id: ProductId,
        kind: TransactionKind,
        quantity: i64,
        reference: OrderNumber,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            kind,
            quantity,
            reference,
            occurred_at: Utc::now(),
        }
    }
}

/// One intended stock mutation, produced by the order service and applied
/// atomically by the store together with the status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_id: ProductId,
    pub kind: TransactionKind,
    pub quantity: i64,
}

impl StockMovement {
    pub fn outbound(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            kind: TransactionKind::Out,
            quantity,
        }
    }

    pub fn inbound(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            kind: TransactionKind::In,
            quantity,
        }
    }
}

/// Replays a product's transaction log over an initial stock figure.
///
/// Invariant checked by tests: `replayed_stock(initial, log) == current_stock`.
pub fn replayed_stock(initial: i64, transactions: &[InventoryTransaction]) -> i64 {
    transactions
        .iter()
        .fold(initial, |stock, tx| stock + tx.kind.signed(tx.quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_stock_is_derived() {
        let mut product = Product::new("SKU-001", "Widget", Money::from_cents(1000), 25);
        product.reserved_stock = 10;
        assert_eq!(product.available_stock(), 15);
    }

    #[test]
    fn test_needs_reorder_only_with_policy() {
        let product = Product::new("SKU-001", "Widget", Money::from_cents(1000), 3);
        assert!(!product.needs_reorder());

        let product = product.with_reorder_policy(2, 5, 50);
        assert!(product.needs_reorder());
    }

    #[test]
    fn test_needs_reorder_above_point() {
        let product = Product::new("SKU-001", "Widget", Money::from_cents(1000), 100)
            .with_reorder_policy(2, 5, 50);
        assert!(!product.needs_reorder());
    }

    #[test]
    fn test_transaction_kind_signed() {
        assert_eq!(TransactionKind::In.signed(5), 5);
        assert_eq!(TransactionKind::Out.signed(5), -5);
    }

    #[test]
    fn test_transaction_kind_parse_roundtrip() {
        assert_eq!(TransactionKind::parse("IN"), Some(TransactionKind::In));
        assert_eq!(TransactionKind::parse("OUT"), Some(TransactionKind::Out));
        assert_eq!(TransactionKind::parse("MOVE"), None);
    }

    #[test]
    fn test_replayed_stock() {
        let reference = OrderNumber::from("DIS-20260806-AAAA1111");
        let log = vec![
            InventoryTransaction::record(
                ProductId::new("SKU-001"),
                TransactionKind::Out,
                5,
                reference.clone(),
            ),
            InventoryTransaction::record(
                ProductId::new("SKU-001"),
                TransactionKind::In,
                20,
                reference.clone(),
            ),
            InventoryTransaction::record(
                ProductId::new("SKU-001"),
                TransactionKind::Out,
                3,
                reference,
            ),
        ];
        assert_eq!(replayed_stock(10, &log), 22);
    }

    #[test]
    fn test_replayed_stock_empty_log() {
        assert_eq!(replayed_stock(7, &[]), 7);
    }
}
