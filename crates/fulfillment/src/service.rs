//! The tier order service: the state machine driving order lifecycle and
//! its coupled inventory side effects.

use std::sync::Arc;

use common::{OrderId, OrderNumber, Tier};
use domain::{LineItem, Order, OrderOrigin, OrderStatus, ProductId, StockMovement};
use store::{OrderCommit, TierStore};

use crate::error::{FulfillmentError, Result};
use crate::gateway::{ForwardLine, ForwardOrderRequest, PeerGateway};
use crate::notifier::{AcceptanceNotifier, DisabledNotifier};

/// One requested line of a new order: quantities only, prices are always
/// taken from this tier's own price list.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl NewOrderLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A locally originated order request (customer order, replenishment).
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub items: Vec<NewOrderLine>,
    pub shipping_address: Option<String>,
}

/// Result of a stock availability check. Pure read, no side effect.
#[derive(Debug, Clone)]
pub struct StockCheck {
    pub is_available: bool,
    pub available_stock: i64,
    /// Advisory replenishment suggestion once at or below the reorder point.
    pub suggested_reorder_quantity: Option<i64>,
}

/// Order service for one tier.
///
/// Owns the `Pending → {Accepted, Cancelled}` state machine and the exactly
/// one local transaction boundary per operation. Cross-tier calls (the
/// forwarding gateway and the acceptance notifier) happen strictly outside
/// that boundary: forwarding before the local insert (so an upstream refusal
/// leaves nothing behind), notification after the local commit (so its
/// failure cannot revert anything).
pub struct TierOrderService<S: TierStore> {
    tier: Tier,
    store: S,
    gateway: Option<Arc<dyn PeerGateway>>,
    notifier: Arc<dyn AcceptanceNotifier>,
}

impl<S: TierStore> TierOrderService<S> {
    /// Creates a service with no upstream gateway and no notifier wired.
    pub fn new(tier: Tier, store: S) -> Self {
        Self {
            tier,
            store,
            gateway: None,
            notifier: Arc::new(DisabledNotifier),
        }
    }

    /// Wires the gateway used to forward locally originated orders upstream.
    pub fn with_gateway(mut self, gateway: Arc<dyn PeerGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Wires the notifier used to report acceptance back to order origins.
    pub fn with_notifier(mut self, notifier: Arc<dyn AcceptanceNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The tier this service runs as.
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prices the requested lines from this tier's own ledger.
    ///
    /// Caller-supplied prices never enter the system; a compromised or buggy
    /// caller cannot dictate totals. Lines are priced in the supplied order
    /// and duplicate SKUs stay independent.
    async fn price_lines(&self, items: &[NewOrderLine]) -> Result<Vec<LineItem>> {
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = self
                .store
                .product(&item.product_id)
                .await?
                .ok_or_else(|| FulfillmentError::ProductNotFound(item.product_id.clone()))?;
            if !product.active {
                return Err(FulfillmentError::ProductInactive(item.product_id.clone()));
            }
            lines.push(LineItem::new(
                item.product_id.clone(),
                item.quantity,
                product.unit_price,
            ));
        }
        Ok(lines)
    }

    /// Creates a Pending order on behalf of a peer tier.
    ///
    /// Validates every SKU against the local catalog and prices from the
    /// local price list; inventory is not touched. The caller's order number
    /// is stored for acceptance-callback correlation.
    #[tracing::instrument(skip(self, items, shipping_address), fields(tier = %self.tier))]
    pub async fn create_from_peer(
        &self,
        items: Vec<NewOrderLine>,
        counterparty_order_number: OrderNumber,
        shipping_address: Option<String>,
    ) -> Result<Order> {
        let lines = self.price_lines(&items).await?;
        let order = Order::new(
            self.tier,
            OrderOrigin::Peer,
            lines,
            Some(counterparty_order_number),
            shipping_address,
        )?;
        self.store.insert_order(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            total = %order.total_amount(),
            "peer order created"
        );
        Ok(order)
    }

    /// Creates a locally originated Pending order, forwarding it upstream
    /// first when this tier has an upstream.
    ///
    /// The forwarding POST carries this tier's order number so the upstream
    /// can call back on acceptance. If the upstream call fails or answers
    /// non-2xx, the local order is never persisted — all-or-nothing across
    /// the hop. This is the one place where cross-tier and local consistency
    /// are coupled.
    #[tracing::instrument(skip(self, new_order), fields(tier = %self.tier))]
    pub async fn create_forwarded(&self, new_order: NewOrder) -> Result<Order> {
        let lines = self.price_lines(&new_order.items).await?;
        let mut order = Order::new(
            self.tier,
            OrderOrigin::Local,
            lines,
            None,
            new_order.shipping_address.clone(),
        )?;

        if let Some(gateway) = &self.gateway {
            let request = ForwardOrderRequest {
                counterparty_order_number: order.order_number().clone(),
                items: new_order
                    .items
                    .iter()
                    .map(|item| ForwardLine {
                        product_id: item.product_id.clone(),
                        quantity: item.quantity,
                    })
                    .collect(),
                shipping_address: new_order.shipping_address,
            };
            let ack = gateway
                .forward_order(&request)
                .await
                .map_err(|e| FulfillmentError::UpstreamRejected(e.to_string()))?;
            order.set_counterparty_order_number(ack.order_number);
        }

        self.store.insert_order(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            forwarded = self.gateway.is_some(),
            "local order created"
        );
        Ok(order)
    }

    /// Accepts a Pending order: all-or-nothing stock decrement, one OUT
    /// audit entry per line item, status flip — a single atomic commit.
    ///
    /// Only after that commit, if the order originated at a peer tier, the
    /// acceptance notifier fires. A notification failure is logged and
    /// swallowed; the committed accept stands and the upstream tier stays
    /// unaware until someone investigates.
    #[tracing::instrument(skip(self), fields(tier = %self.tier))]
    pub async fn accept(&self, order_id: OrderId) -> Result<Order> {
        let start = std::time::Instant::now();

        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if !order.status().can_accept() {
            return Err(FulfillmentError::InvalidTransition {
                current: order.status(),
                action: "accept",
            });
        }

        let movements = order
            .line_items()
            .iter()
            .map(|line| StockMovement::outbound(line.product_id.clone(), line.quantity as i64))
            .collect();
        let order = self
            .store
            .apply_commit(OrderCommit::with_movements(
                order_id,
                OrderStatus::Accepted,
                movements,
            ))
            .await?;

        metrics::counter!("orders_accepted_total").increment(1);
        metrics::histogram!("order_accept_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(order_number = %order.order_number(), "order accepted");

        if order.origin() == OrderOrigin::Peer {
            if let Some(counterparty) = order.counterparty_order_number() {
                if let Err(e) = self.notifier.order_accepted(counterparty).await {
                    metrics::counter!("notification_failures_total").increment(1);
                    tracing::warn!(
                        order_number = %order.order_number(),
                        counterparty = %counterparty,
                        error = %e,
                        "acceptance notification failed; accepted order stands"
                    );
                }
            }
        }

        Ok(order)
    }

    /// Cancels a Pending order. Nothing was reserved, so there is no
    /// inventory effect.
    #[tracing::instrument(skip(self), fields(tier = %self.tier))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if !order.status().can_cancel() {
            return Err(FulfillmentError::InvalidTransition {
                current: order.status(),
                action: "cancel",
            });
        }

        let order = self
            .store
            .apply_commit(OrderCommit::status_only(order_id, OrderStatus::Cancelled))
            .await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_number = %order.order_number(), "order cancelled");
        Ok(order)
    }

    /// Handles the downstream tier's acceptance callback.
    ///
    /// The caller quotes the order number this tier assigned (its stored
    /// counterparty number). The matching Pending order flips to Accepted
    /// and the arriving goods land on the ledger as one IN entry per line
    /// item, atomically. This path never re-notifies anyone.
    #[tracing::instrument(skip(self), fields(tier = %self.tier))]
    pub async fn reconcile_acceptance(&self, order_number: &OrderNumber) -> Result<Order> {
        let order = self
            .store
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNumberNotFound(order_number.clone()))?;
        if !order.status().can_accept() {
            return Err(FulfillmentError::InvalidTransition {
                current: order.status(),
                action: "accept",
            });
        }

        let movements = order
            .line_items()
            .iter()
            .map(|line| StockMovement::inbound(line.product_id.clone(), line.quantity as i64))
            .collect();
        let order = self
            .store
            .apply_commit(OrderCommit::with_movements(
                order.id(),
                OrderStatus::Accepted,
                movements,
            ))
            .await?;

        metrics::counter!("orders_reconciled_total").increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            "downstream acceptance reconciled"
        );
        Ok(order)
    }

    /// Checks whether the requested quantity is available. Pure read.
    #[tracing::instrument(skip(self), fields(tier = %self.tier))]
    pub async fn check_stock(&self, sku: &ProductId, quantity: i64) -> Result<StockCheck> {
        let product = self
            .store
            .product(sku)
            .await?
            .ok_or_else(|| FulfillmentError::ProductNotFound(sku.clone()))?;

        let available_stock = product.available_stock();
        Ok(StockCheck {
            is_available: available_stock >= quantity,
            available_stock,
            suggested_reorder_quantity: if product.needs_reorder() {
                product.reorder_quantity
            } else {
                None
            },
        })
    }

    /// Loads an order by ID.
    pub async fn order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.store.order(order_id).await?)
    }

    /// Lists all orders on this tier, oldest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }
}
