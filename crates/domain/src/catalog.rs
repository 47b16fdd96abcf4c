//! Catalog product as seen by the checkout core.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::Money;

/// A catalog product.
///
/// `quantity_available` is the shared mutable stock counter. It is
/// nullable: catalogs that never set a stock count behave as sold out.
/// The stored value is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub unit_price: Money,
    pub quantity_available: Option<i64>,
}

impl Product {
    /// Creates a new product.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        unit_price: Money,
        quantity_available: Option<i64>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            unit_price,
            quantity_available,
        }
    }

    /// Returns true if at least `requested` units are in stock.
    ///
    /// A missing stock count means nothing is available.
    pub fn has_stock(&self, requested: u32) -> bool {
        match self.quantity_available {
            Some(available) => available >= requested as i64,
            None => false,
        }
    }
}
