use async_trait::async_trait;
use common::{OrderId, OrderNumber};
use domain::{InventoryTransaction, Order, OrderStatus, Product, ProductId, StockMovement};

use crate::error::Result;

/// A status transition together with the stock effects it authorizes.
///
/// Applied atomically by [`TierStore::apply_commit`]: either the status
/// changes AND every movement lands on the ledger (one audit entry per
/// movement, referencing the order number), or nothing is written at all.
#[derive(Debug, Clone)]
pub struct OrderCommit {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
    pub movements: Vec<StockMovement>,
}

impl OrderCommit {
    /// A commit with stock effects (accept / reconciliation).
    pub fn with_movements(
        order_id: OrderId,
        new_status: OrderStatus,
        movements: Vec<StockMovement>,
    ) -> Self {
        Self {
            order_id,
            new_status,
            movements,
        }
    }

    /// A pure status change (cancellation).
    pub fn status_only(order_id: OrderId, new_status: OrderStatus) -> Self {
        Self {
            order_id,
            new_status,
            movements: Vec::new(),
        }
    }
}

/// Storage owned by exactly one tier.
///
/// Every method is a single ACID boundary scoped to this tier's datastore;
/// no call here ever touches another tier's tables. Concurrent
/// `apply_commit` calls on the same order serialize on the order row, so a
/// second accept observes the already-terminal status and fails the state
/// machine precondition rather than double-applying stock effects.
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Persists a freshly created order.
    ///
    /// Fails with `DuplicateOrderNumber` if the number is already taken.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by its tier-local ID.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads an order by its own order number (used to resolve acceptance
    /// callbacks, where the caller quotes the number this tier assigned).
    async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>>;

    /// Lists all orders on this tier, oldest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Atomically applies a status transition plus its stock movements.
    ///
    /// Validates the transition against the order state machine and, for
    /// every outbound movement, that `current_stock` covers the quantity;
    /// on any failure nothing is written and the error identifies the first
    /// offending product. Returns the updated order.
    async fn apply_commit(&self, commit: OrderCommit) -> Result<Order>;

    /// Inserts or replaces a product on this tier's ledger.
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    /// Loads a product by SKU.
    async fn product(&self, sku: &ProductId) -> Result<Option<Product>>;

    /// Returns the append-only transaction log for a product, in
    /// occurrence order.
    async fn transactions_for(&self, sku: &ProductId) -> Result<Vec<InventoryTransaction>>;
}
