use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, OrderNumber};
use domain::{
    InventoryTransaction, Order, Product, ProductId, TransactionKind,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{OrderCommit, TierStore};

#[derive(Default)]
struct TierState {
    orders: HashMap<OrderId, Order>,
    numbers: HashMap<String, OrderId>,
    products: HashMap<String, Product>,
    transactions: Vec<InventoryTransaction>,
}

/// In-memory tier store for tests and local development.
///
/// A single write lock around the whole tier state makes every operation
/// atomic, matching the transactional guarantees of the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct MemoryTierStore {
    state: Arc<RwLock<TierState>>,
}

impl MemoryTierStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of inventory transactions recorded.
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }
}

#[async_trait]
impl TierStore for MemoryTierStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        let number = order.order_number().as_str().to_string();
        if state.numbers.contains_key(&number) {
            return Err(StoreError::DuplicateOrderNumber(
                order.order_number().clone(),
            ));
        }
        state.numbers.insert(number, order.id());
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .numbers
            .get(number.as_str())
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at());
        Ok(orders)
    }

    async fn apply_commit(&self, commit: OrderCommit) -> Result<Order> {
        let mut state = self.state.write().await;

        let mut order = state
            .orders
            .get(&commit.order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(commit.order_id))?;

        // Validate the transition and every movement before mutating anything,
        // so a failure leaves the state untouched.
        order.transition(commit.new_status)?;

        for movement in &commit.movements {
            let product = state
                .products
                .get(movement.product_id.as_str())
                .ok_or_else(|| StoreError::ProductNotFound(movement.product_id.clone()))?;
            if movement.kind == TransactionKind::Out && product.current_stock < movement.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: movement.product_id.clone(),
                    available: product.current_stock,
                    required: movement.quantity,
                });
            }
        }

        let reference = order.order_number().clone();
        for movement in &commit.movements {
            if let Some(product) = state.products.get_mut(movement.product_id.as_str()) {
                product.current_stock += movement.kind.signed(movement.quantity);
            }
            state.transactions.push(InventoryTransaction::record(
                movement.product_id.clone(),
                movement.kind,
                movement.quantity,
                reference.clone(),
            ));
        }

        state.orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.sku.as_str().to_string(), product.clone());
        Ok(())
    }

    async fn product(&self, sku: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(sku.as_str()).cloned())
    }

    async fn transactions_for(&self, sku: &ProductId) -> Result<Vec<InventoryTransaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| &tx.product_id == sku)
            .cloned()
            .collect())
    }
}
