//! Pending cart lines.

use common::{CartLineId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A pending (product, quantity) request that has not yet been
/// committed to an order.
///
/// Cart lines are ephemeral: they exist only while a cart is open and
/// are consumed and deleted on successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a new cart line with a fresh identifier.
    pub fn new(user_id: UserId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            id: CartLineId::new(),
            user_id,
            product_id,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_line_gets_fresh_id() {
        let user = UserId::new();
        let product = ProductId::new();
        let a = CartLine::new(user, product, 1);
        let b = CartLine::new(user, product, 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serialization_roundtrip() {
        let line = CartLine::new(UserId::new(), ProductId::new(), 3);
        let json = serde_json::to_string(&line).unwrap();
        let deserialized: CartLine = serde_json::from_str(&json).unwrap();
        assert_eq!(line, deserialized);
    }
}
