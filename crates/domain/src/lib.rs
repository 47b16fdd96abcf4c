//! Data model for the shop backend.
//!
//! This crate provides the core entities:
//! - `Product` with its mutable stock counter
//! - `CartLine` for pending purchases
//! - `Order` / `OrderLine` as the immutable purchase record
//! - `Money` for exact currency arithmetic

pub mod cart;
pub mod catalog;
pub mod money;
pub mod order;

pub use cart::CartLine;
pub use catalog::Product;
pub use money::Money;
pub use order::{Order, OrderLine};
