use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartLineId, OrderId, OrderLineId, ProductId, UserId};
use domain::{CartLine, Money, Order, OrderLine, Product};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    Result, StorageError,
    store::{ShopStore, StockLevel, UnitOfWork},
};

/// SQLSTATEs raised when a unit of work loses a lock race.
const CONTENTION_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
];

/// PostgreSQL-backed shop store.
///
/// Stock decrements are serialized per product with row-level
/// `SELECT ... FOR UPDATE` locks held for the unit of work.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL with a small pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity_available: row.try_get("quantity_available")?,
        })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
        Ok(CartLine {
            id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
        })
    }

    fn row_to_order_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: OrderLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: row
                .try_get::<Option<Uuid>, _>("product_id")?
                .map(ProductId::from_uuid),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price_at_purchase: Money::from_cents(
                row.try_get("unit_price_at_purchase_cents")?,
            ),
        })
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_at_purchase_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_line).collect()
    }

    fn row_to_order_header(row: &PgRow) -> Result<(OrderId, UserId, DateTime<Utc>, Money)> {
        Ok((
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            row.try_get("created_at")?,
            Money::from_cents(row.try_get("total_amount_cents")?),
        ))
    }
}

/// Maps lock-race SQLSTATEs to `StorageError::Contention`.
fn classify(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(code) = db_err.code()
            && CONTENTION_SQLSTATES.contains(&code.as_ref())
        {
            tracing::warn!(sqlstate = %code, "lock contention in unit of work");
            return StorageError::Contention;
        }
        if matches!(db_err.kind(), sqlx::error::ErrorKind::CheckViolation) {
            return StorageError::ConstraintViolation(db_err.message().to_string());
        }
    }
    StorageError::Database(e)
}

/// A unit of work over a single PostgreSQL transaction.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn stock_for_update(&mut self, product_id: ProductId) -> Result<Option<StockLevel>> {
        // Row lock: concurrent units of work on the same product block
        // here until the holder commits or rolls back.
        let row = sqlx::query("SELECT quantity_available FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(classify)?;

        match row {
            Some(row) => Ok(Some(StockLevel {
                available: row.try_get("quantity_available")?,
            })),
            None => Ok(None),
        }
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET quantity_available = quantity_available - $2
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(quantity as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, created_at, total_amount_cents)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.created_at)
        .bind(order.total_amount.cents())
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, quantity, unit_price_at_purchase_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.map(|id| id.as_uuid()))
            .bind(line.quantity as i32)
            .bind(line.unit_price_at_purchase.cents())
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        }

        Ok(())
    }

    async fn delete_cart_lines(&mut self, line_ids: &[CartLineId]) -> Result<()> {
        let ids: Vec<Uuid> = line_ids.iter().map(CartLineId::as_uuid).collect();
        sqlx::query("DELETE FROM cart_lines WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl ShopStore for PostgresStore {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await.map_err(classify)?;
        Ok(PgUnitOfWork { tx })
    }

    async fn product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, unit_price_cents, quantity_available
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, unit_price_cents, quantity_available)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(product.unit_price.cents())
        .bind(product.quantity_available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_product_price(&self, product_id: ProductId, unit_price: Money) -> Result<()> {
        sqlx::query("UPDATE products SET unit_price_cents = $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(unit_price.cents())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, quantity
            FROM cart_lines
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_line).collect()
    }

    async fn cart_line(&self, line_id: CartLineId) -> Result<Option<CartLine>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, product_id, quantity
            FROM cart_lines
            WHERE id = $1
            "#,
        )
        .bind(line_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart_line).transpose()
    }

    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLine> {
        // Merge-on-add: bump the quantity of an existing line for the
        // same product instead of inserting a second one.
        let merged = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity = quantity + $3
            WHERE user_id = $1 AND product_id = $2
            RETURNING id, user_id, product_id, quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = merged {
            return Self::row_to_cart_line(row);
        }

        let line = CartLine::new(user_id, product_id, quantity);
        sqlx::query(
            r#"
            INSERT INTO cart_lines (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.user_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(line.quantity as i32)
        .execute(&self.pool)
        .await?;

        Ok(line)
    }

    async fn update_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<()> {
        sqlx::query("UPDATE cart_lines SET quantity = $2 WHERE id = $1")
            .bind(line_id.as_uuid())
            .bind(quantity as i32)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<()> {
        sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(line_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, created_at, total_amount_cents
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let (id, user_id, created_at, total_amount) = Self::row_to_order_header(&row)?;
        let lines = self.order_lines(id).await?;

        Ok(Some(Order {
            id,
            user_id,
            created_at,
            total_amount,
            lines,
        }))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, created_at, total_amount_cents
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let (id, user_id, created_at, total_amount) = Self::row_to_order_header(&row)?;
            let lines = self.order_lines(id).await?;
            orders.push(Order {
                id,
                user_id,
                created_at,
                total_amount,
                lines,
            });
        }

        Ok(orders)
    }
}
