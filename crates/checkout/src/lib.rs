//! Checkout core for the shop backend.
//!
//! Converts a user's mutable cart into an immutable order while
//! guaranteeing stock counters never go negative under concurrent
//! checkouts:
//! - `reservation` — two-phase stock validation and atomic decrement
//! - `CheckoutService` — the orchestrator tying cart, reservation,
//!   order ledger, and cart clearing into one atomic unit of work

pub mod error;
pub mod reservation;
pub mod service;

pub use error::{CheckoutError, Result};
pub use reservation::Reservation;
pub use service::CheckoutService;
