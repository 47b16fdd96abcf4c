//! Storage layer for the shop backend.
//!
//! Exposes the [`ShopStore`] seam with two backends:
//! - [`PostgresStore`] for production, serializing stock decrements
//!   with row-level locks
//! - [`MemoryStore`] for tests and local runs
//!
//! Anything that must commit or roll back as one group goes through a
//! [`UnitOfWork`] obtained from `ShopStore::begin`.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StorageError};
pub use memory::{MemoryStore, MemoryUnitOfWork};
pub use postgres::{PgUnitOfWork, PostgresStore};
pub use store::{ShopStore, StockLevel, UnitOfWork};
