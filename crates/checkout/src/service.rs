//! Checkout orchestrator.

use common::{CartLineId, OrderId, UserId};
use domain::{Order, OrderLine};
use store::{ShopStore, StorageError, UnitOfWork};

use crate::error::{CheckoutError, Result};
use crate::reservation::{self, Reservation};

/// Attempts per checkout before giving up on lock contention. The
/// outcome is deterministic once the winning checkout commits, so
/// there is no value in retrying for long.
const MAX_ATTEMPTS: u32 = 3;

/// Orchestrates checkout: cart → reservation → order → cart clear.
///
/// Everything after the pre-check runs inside one unit of work, so the
/// stock decrements, the order rows, and the cart deletion commit or
/// roll back as a single group.
pub struct CheckoutService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> CheckoutService<S> {
    /// Creates a new checkout service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Converts the user's cart into an immutable order.
    ///
    /// Fails with a business error (empty cart, missing product, short
    /// stock) without any mutation, or with `TransientContention` after
    /// exhausting lock-contention retries. On success the cart is empty
    /// and the returned order carries its price-frozen lines.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<Order> {
        metrics::counter!("checkout_total").increment(1);
        let start = std::time::Instant::now();

        let result = self.checkout_inner(user_id).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                tracing::info!(order_id = %order.id, total = %order.total_amount, "checkout completed");
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total").increment(1);
                tracing::warn!(error = %e, "checkout failed");
            }
        }

        result
    }

    async fn checkout_inner(&self, user_id: UserId) -> Result<Order> {
        // 1. Load the cart.
        let cart = self.store.cart_lines(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let line_ids: Vec<CartLineId> = cart.iter().map(|line| line.id).collect();
        let requests = reservation::merge_cart_lines(&cart);

        // 2. Fast pre-check outside the unit of work, snapshotting prices.
        let reservations = reservation::pre_check(&self.store, &requests).await?;

        // 3.-6. Authoritative phase, retried only on lock contention.
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.commit_checkout(user_id, &reservations, &line_ids).await {
                Err(CheckoutError::Storage(StorageError::Contention)) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(CheckoutError::TransientContention);
                    }
                    tracing::warn!(attempt, "lock contention during checkout, retrying");
                }
                other => return other,
            }
        }
    }

    /// Runs one attempt of the atomic unit of work: reserve + decrement
    /// stock, write the order ledger, clear the cart, commit.
    ///
    /// On any error the unit of work is dropped and rolls back.
    async fn commit_checkout(
        &self,
        user_id: UserId,
        reservations: &[Reservation],
        line_ids: &[CartLineId],
    ) -> Result<Order> {
        let mut uow = self.store.begin().await?;

        reservation::reserve(&mut uow, reservations).await?;

        let order_id = OrderId::new();
        let lines: Vec<OrderLine> = reservations
            .iter()
            .map(|r| OrderLine::new(order_id, r.product_id, r.quantity, r.unit_price))
            .collect();
        let order = Order::from_lines(order_id, user_id, lines);

        uow.insert_order(&order).await?;
        uow.delete_cart_lines(line_ids).await?;
        uow.commit().await?;

        Ok(order)
    }

    /// Loads an order on behalf of a user, enforcing ownership.
    ///
    /// Returns `None` if the order does not exist and `Unauthorized` if
    /// it belongs to someone else.
    pub async fn order_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>> {
        match self.store.order(order_id).await? {
            Some(order) if order.user_id == user_id => Ok(Some(order)),
            Some(_) => Err(CheckoutError::Unauthorized),
            None => Ok(None),
        }
    }

    /// Lists a user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;
    use domain::{Money, Product};
    use store::MemoryStore;

    use super::*;

    fn service() -> CheckoutService<MemoryStore> {
        CheckoutService::new(MemoryStore::new())
    }

    async fn seed_product(
        service: &CheckoutService<MemoryStore>,
        price_cents: i64,
        stock: Option<i64>,
    ) -> ProductId {
        let product = Product::new(
            ProductId::new(),
            "Widget",
            Money::from_cents(price_cents),
            stock,
        );
        service.store().insert_product(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let service = service();
        let result = service.checkout(UserId::new()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn checkout_creates_order_and_clears_cart() {
        let service = service();
        let user = UserId::new();
        let product = seed_product(&service, 1000, Some(5)).await;
        service.store().add_cart_line(user, product, 2).await.unwrap();

        let order = service.checkout(user).await.unwrap();

        assert_eq!(order.total_amount.cents(), 2000);
        assert_eq!(order.lines.len(), 1);
        assert!(service.store().cart_lines(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn order_access_enforces_ownership() {
        let service = service();
        let owner = UserId::new();
        let product = seed_product(&service, 500, Some(1)).await;
        service.store().add_cart_line(owner, product, 1).await.unwrap();
        let order = service.checkout(owner).await.unwrap();

        let stranger = UserId::new();
        let result = service.order_for_user(order.id, stranger).await;
        assert!(matches!(result, Err(CheckoutError::Unauthorized)));

        let owned = service.order_for_user(order.id, owner).await.unwrap();
        assert_eq!(owned.unwrap().id, order.id);
    }

    #[tokio::test]
    async fn missing_order_is_none() {
        let service = service();
        let result = service
            .order_for_user(OrderId::new(), UserId::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn orders_listed_newest_first() {
        let service = service();
        let user = UserId::new();
        let product = seed_product(&service, 100, Some(10)).await;

        service.store().add_cart_line(user, product, 1).await.unwrap();
        let first = service.checkout(user).await.unwrap();

        // created_at must differ for the ordering to be observable.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.store().add_cart_line(user, product, 1).await.unwrap();
        let second = service.checkout(user).await.unwrap();

        let orders = service.orders_for_user(user).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].id, first.id);
    }
}
