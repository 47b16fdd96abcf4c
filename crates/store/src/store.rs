use async_trait::async_trait;
use common::{CartLineId, OrderId, ProductId, UserId};
use domain::{CartLine, Money, Order, Product};

use crate::Result;

/// Stock counter for a single product, as read under the row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    /// Available quantity; `None` if the catalog never set a count.
    pub available: Option<i64>,
}

impl StockLevel {
    /// Returns true if at least `requested` units are available.
    pub fn covers(&self, requested: u32) -> bool {
        match self.available {
            Some(available) => available >= requested as i64,
            None => false,
        }
    }
}

/// An open atomic unit of work.
///
/// Every mutation performed through a unit of work is staged: nothing
/// becomes visible to other callers until `commit`. Dropping a unit of
/// work without committing rolls everything back. Reading a product's
/// stock through `stock_for_update` serializes concurrent units of
/// work touching the same product for the lifetime of the unit — the
/// read-revalidate-decrement sequence can never interleave.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads a product's stock counter, taking the per-product lock.
    ///
    /// Returns `None` if the product does not exist.
    async fn stock_for_update(&mut self, product_id: ProductId) -> Result<Option<StockLevel>>;

    /// Decrements a product's stock counter by `quantity`.
    ///
    /// Callers must have validated the level via `stock_for_update`
    /// first; decrementing below zero is a constraint violation.
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Inserts an order header and all of its lines.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Deletes the given cart lines.
    async fn delete_cart_lines(&mut self, line_ids: &[CartLineId]) -> Result<()>;

    /// Commits every staged mutation as one atomic group.
    async fn commit(self) -> Result<()>;
}

/// Core trait for shop storage backends.
///
/// Pool-level reads and cart mutations live directly on the store;
/// anything that must be atomic with a stock decrement goes through
/// `begin` and the returned [`UnitOfWork`].
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// The unit-of-work type this backend produces.
    type Uow: UnitOfWork;

    /// Opens a new atomic unit of work.
    async fn begin(&self) -> Result<Self::Uow>;

    // -- Catalog --

    /// Fetches a product by id.
    async fn product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Inserts a new catalog product.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Updates a product's current price. Does not touch order history.
    async fn set_product_price(&self, product_id: ProductId, unit_price: Money) -> Result<()>;

    // -- Cart --

    /// Fetches all cart lines for a user.
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>>;

    /// Fetches a single cart line by id.
    async fn cart_line(&self, line_id: CartLineId) -> Result<Option<CartLine>>;

    /// Adds a product to a user's cart, merging with an existing line
    /// for the same product if one exists.
    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLine>;

    /// Replaces a cart line's quantity.
    async fn update_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<()>;

    /// Removes a single cart line.
    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<()>;

    // -- Orders --

    /// Fetches an order with its lines.
    async fn order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Fetches all orders for a user, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}
