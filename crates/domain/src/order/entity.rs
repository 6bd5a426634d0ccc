//! Order entity.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderNumber, Tier};
use serde::{Deserialize, Serialize};

use super::{LineItem, Money, OrderError, OrderOrigin, OrderStatus};

/// An order owned by one tier.
///
/// Structurally identical across Seller, Distributor, and Manufacturer; the
/// owning tier is recorded on the row. The total is computed once from the
/// line items at creation and never recomputed afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    tier: Tier,
    origin: OrderOrigin,
    counterparty_order_number: Option<OrderNumber>,
    status: OrderStatus,
    line_items: Vec<LineItem>,
    total_amount: Money,
    shipping_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new Pending order.
    ///
    /// Validates that at least one line item is present, that every quantity
    /// and unit price is positive, and computes the immutable total. Line
    /// items are kept in the supplied order; duplicate SKUs stay separate.
    pub fn new(
        tier: Tier,
        origin: OrderOrigin,
        line_items: Vec<LineItem>,
        counterparty_order_number: Option<OrderNumber>,
        shipping_address: Option<String>,
    ) -> Result<Self, OrderError> {
        if line_items.is_empty() {
            return Err(OrderError::NoLineItems);
        }
        for line in &line_items {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
            if !line.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    cents: line.unit_price.cents(),
                });
            }
        }

        let total_amount = line_items.iter().map(LineItem::line_total).sum();
        let now = Utc::now();

        Ok(Self {
            id: OrderId::new(),
            order_number: OrderNumber::generate(tier),
            tier,
            origin,
            counterparty_order_number,
            status: OrderStatus::Pending,
            line_items,
            total_amount,
            shipping_address,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a status transition, enforcing the state machine.
    ///
    /// The only legal transitions are Pending → Accepted and
    /// Pending → Cancelled; anything else fails without mutating the order.
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), OrderError> {
        let legal = match to {
            OrderStatus::Accepted => self.status.can_accept(),
            OrderStatus::Cancelled => self.status.can_cancel(),
            OrderStatus::Pending => false,
        };
        if !legal {
            return Err(OrderError::InvalidTransition {
                current: self.status,
                action: match to {
                    OrderStatus::Accepted => "accept",
                    OrderStatus::Cancelled => "cancel",
                    OrderStatus::Pending => "reopen",
                },
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the order number the upstream tier assigned to the forwarded
    /// counterpart of this order.
    pub fn set_counterparty_order_number(&mut self, number: OrderNumber) {
        self.counterparty_order_number = Some(number);
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn origin(&self) -> OrderOrigin {
        self.origin
    }

    pub fn counterparty_order_number(&self) -> Option<&OrderNumber> {
        self.counterparty_order_number.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn shipping_address(&self) -> Option<&str> {
        self.shipping_address.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_line_order() -> Order {
        Order::new(
            Tier::Distributor,
            OrderOrigin::Peer,
            vec![
                LineItem::new("SKU-001", 5, Money::from_cents(1000)),
                LineItem::new("SKU-002", 3, Money::from_cents(2000)),
            ],
            Some(OrderNumber::from("SEL-20260806-AAAA1111")),
            Some("1 Main St".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_is_pending_with_computed_total() {
        let order = two_line_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        // 5 * $10 + 3 * $20 = $110
        assert_eq!(order.total_amount().cents(), 11_000);
        assert_eq!(order.line_items().len(), 2);
        assert!(order.order_number().as_str().starts_with("DIS-"));
    }

    #[test]
    fn test_empty_order_rejected() {
        let result = Order::new(Tier::Seller, OrderOrigin::Local, vec![], None, None);
        assert!(matches!(result, Err(OrderError::NoLineItems)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = Order::new(
            Tier::Seller,
            OrderOrigin::Local,
            vec![LineItem::new("SKU-001", 0, Money::from_cents(100))],
            None,
            None,
        );
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_zero_price_rejected() {
        let result = Order::new(
            Tier::Seller,
            OrderOrigin::Local,
            vec![LineItem::new("SKU-001", 1, Money::zero())],
            None,
            None,
        );
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn test_duplicate_sku_lines_stay_separate() {
        let order = Order::new(
            Tier::Distributor,
            OrderOrigin::Peer,
            vec![
                LineItem::new("SKU-001", 2, Money::from_cents(1000)),
                LineItem::new("SKU-001", 4, Money::from_cents(1000)),
            ],
            None,
            None,
        )
        .unwrap();
        assert_eq!(order.line_items().len(), 2);
        assert_eq!(order.total_amount().cents(), 6000);
    }

    #[test]
    fn test_accept_transition() {
        let mut order = two_line_order();
        order.transition(OrderStatus::Accepted).unwrap();
        assert_eq!(order.status(), OrderStatus::Accepted);
    }

    #[test]
    fn test_cancel_transition() {
        let mut order = two_line_order();
        order.transition(OrderStatus::Cancelled).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_double_accept_rejected() {
        let mut order = two_line_order();
        order.transition(OrderStatus::Accepted).unwrap();
        let result = order.transition(OrderStatus::Accepted);
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                current: OrderStatus::Accepted,
                ..
            })
        ));
    }

    #[test]
    fn test_cancel_after_accept_rejected() {
        let mut order = two_line_order();
        order.transition(OrderStatus::Accepted).unwrap();
        assert!(order.transition(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_reopen_rejected() {
        let mut order = two_line_order();
        order.transition(OrderStatus::Cancelled).unwrap();
        assert!(order.transition(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_total_unchanged_by_transition() {
        let mut order = two_line_order();
        let before = order.total_amount();
        order.transition(OrderStatus::Accepted).unwrap();
        assert_eq!(order.total_amount(), before);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = two_line_order();
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
