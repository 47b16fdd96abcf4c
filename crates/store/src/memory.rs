use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use common::{CartLineId, OrderId, ProductId, UserId};
use domain::{CartLine, Money, Order, Product};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StorageError,
    store::{ShopStore, StockLevel, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    cart_lines: Vec<CartLine>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory shop store for tests and local runs.
///
/// A unit of work takes the store-wide mutex for its whole lifetime,
/// which serializes concurrent read-revalidate-decrement sequences the
/// same way the PostgreSQL row lock does. Mutations are staged on a
/// copy of the state and written back on commit; dropping the unit of
/// work discards the copy.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    contention_failures: Arc<AtomicU32>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to `begin` fail with
    /// `StorageError::Contention`. Test hook for retry behavior.
    pub fn fail_contention(&self, n: u32) {
        self.contention_failures.store(n, Ordering::SeqCst);
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

/// A unit of work over a staged copy of the in-memory state.
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn stock_for_update(&mut self, product_id: ProductId) -> Result<Option<StockLevel>> {
        Ok(self.staged.products.get(&product_id).map(|p| StockLevel {
            available: p.quantity_available,
        }))
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        let product = self.staged.products.get_mut(&product_id).ok_or_else(|| {
            StorageError::ConstraintViolation(format!("no such product: {product_id}"))
        })?;

        match product.quantity_available {
            Some(available) if available >= quantity as i64 => {
                product.quantity_available = Some(available - quantity as i64);
                Ok(())
            }
            _ => Err(StorageError::ConstraintViolation(format!(
                "stock for product {product_id} would go negative"
            ))),
        }
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete_cart_lines(&mut self, line_ids: &[CartLineId]) -> Result<()> {
        self.staged
            .cart_lines
            .retain(|line| !line_ids.contains(&line.id));
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.staged;
        Ok(())
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    type Uow = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork> {
        if self.contention_failures.load(Ordering::SeqCst) > 0 {
            self.contention_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(StorageError::Contention);
        }

        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnitOfWork { guard, staged })
    }

    async fn product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.state
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn set_product_price(&self, product_id: ProductId, unit_price: Money) -> Result<()> {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.unit_price = unit_price;
        }
        Ok(())
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        Ok(self
            .state
            .lock()
            .await
            .cart_lines
            .iter()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn cart_line(&self, line_id: CartLineId) -> Result<Option<CartLine>> {
        Ok(self
            .state
            .lock()
            .await
            .cart_lines
            .iter()
            .find(|line| line.id == line_id)
            .cloned())
    }

    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLine> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state
            .cart_lines
            .iter_mut()
            .find(|line| line.user_id == user_id && line.product_id == product_id)
        {
            existing.quantity += quantity;
            return Ok(existing.clone());
        }

        let line = CartLine::new(user_id, product_id, quantity);
        state.cart_lines.push(line.clone());
        Ok(line)
    }

    async fn update_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<()> {
        if let Some(line) = self
            .state
            .lock()
            .await
            .cart_lines
            .iter_mut()
            .find(|line| line.id == line_id)
        {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<()> {
        self.state
            .lock()
            .await
            .cart_lines
            .retain(|line| line.id != line_id);
        Ok(())
    }

    async fn order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&order_id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .state
            .lock()
            .await
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
