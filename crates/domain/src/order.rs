//! Immutable order records.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderLineId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::Money;

/// A committed, price-frozen record of a purchased quantity of a
/// product.
///
/// `product_id` is a weak reference: it becomes `None` if the product
/// is later deleted from the catalog, while quantity and price snapshot
/// are preserved for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub quantity: u32,
    pub unit_price_at_purchase: Money,
}

impl OrderLine {
    /// Creates a new order line for a still-existing product.
    pub fn new(
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price_at_purchase: Money,
    ) -> Self {
        Self {
            id: OrderLineId::new(),
            order_id,
            product_id: Some(product_id),
            quantity,
            unit_price_at_purchase,
        }
    }

    /// Returns the total price for this line (quantity × frozen unit price).
    pub fn total_price(&self) -> Money {
        self.unit_price_at_purchase.multiply(self.quantity)
    }
}

/// A completed purchase. Created exactly once per successful checkout
/// and never mutated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub total_amount: Money,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Assembles an order from its lines, computing the total as the
    /// exact sum of per-line totals.
    pub fn from_lines(id: OrderId, user_id: UserId, lines: Vec<OrderLine>) -> Self {
        let total_amount = order_total(&lines);
        Self {
            id,
            user_id,
            created_at: Utc::now(),
            total_amount,
            lines,
        }
    }
}

/// Computes the exact total of a set of order lines.
pub fn order_total(lines: &[OrderLine]) -> Money {
    lines.iter().map(OrderLine::total_price).sum()
}
