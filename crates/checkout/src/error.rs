//! Checkout error taxonomy.

use common::ProductId;
use store::StorageError;
use thiserror::Error;

/// Errors that can occur during checkout and order access.
///
/// All variants except `Storage` are ordinary business-rule failures:
/// they are reported to the caller and never leave partial state
/// behind.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user's cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product has no stock at all (zero or no counter).
    #[error("Product {product_id} is out of stock")]
    StockUnavailable { product_id: ProductId },

    /// The product has stock, but less than requested.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    StockInsufficient {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    /// Lock contention persisted across all retry attempts.
    #[error("Checkout could not complete due to concurrent activity, please retry")]
    TransientContention,

    /// The requesting user does not own the order.
    #[error("Access to this order is not allowed")]
    Unauthorized,

    /// Storage failure. Non-recoverable at this layer.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
