//! Stock reservation: two-phase validation and atomic decrement.
//!
//! Phase one (`pre_check`) runs outside the unit of work on plain pool
//! reads. It rejects obviously-doomed checkouts cheaply and snapshots
//! the unit price for each product. Phase two (`reserve`) runs inside
//! the unit of work: it re-reads every counter under the per-product
//! lock, re-validates, and decrements. The pre-check alone is never
//! sufficient — two concurrent checkouts can both pass it for the last
//! unit; only the locked re-check prevents overselling.

use common::ProductId;
use domain::{CartLine, Money};
use store::{ShopStore, UnitOfWork};

use crate::error::{CheckoutError, Result};

/// A validated reservation request with its price snapshot.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price read during the pre-check; frozen into the order line.
    pub unit_price: Money,
}

/// Collapses cart lines into one request per product.
///
/// Duplicate lines for the same product are additive: they validate and
/// decrement once with the summed quantity, never as two independent
/// reservations. First-seen product order is preserved.
pub fn merge_cart_lines(lines: &[CartLine]) -> Vec<(ProductId, u32)> {
    let mut merged: Vec<(ProductId, u32)> = Vec::new();
    for line in lines {
        match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, quantity)) => *quantity += line.quantity,
            None => merged.push((line.product_id, line.quantity)),
        }
    }
    merged
}

/// Validates an observed stock level against a requested quantity.
fn validate_level(
    product_id: ProductId,
    available: Option<i64>,
    requested: u32,
) -> Result<()> {
    match available {
        None | Some(0) => Err(CheckoutError::StockUnavailable { product_id }),
        Some(available) if available < requested as i64 => Err(CheckoutError::StockInsufficient {
            product_id,
            available,
            requested,
        }),
        Some(_) => Ok(()),
    }
}

/// Phase one: fail fast on missing products and visibly short stock,
/// snapshotting each product's current unit price. No mutation on any
/// path.
pub async fn pre_check<S: ShopStore>(
    store: &S,
    requests: &[(ProductId, u32)],
) -> Result<Vec<Reservation>> {
    let mut reservations = Vec::with_capacity(requests.len());

    for &(product_id, quantity) in requests {
        let product = store
            .product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        validate_level(product_id, product.quantity_available, quantity)?;

        reservations.push(Reservation {
            product_id,
            quantity,
            unit_price: product.unit_price,
        });
    }

    Ok(reservations)
}

/// Phase two: under the unit of work, re-read each counter with the
/// per-product lock held, re-validate, and decrement.
///
/// Any error aborts the caller's unit of work, so no counter changes
/// unless all of them do.
pub async fn reserve<U: UnitOfWork>(uow: &mut U, reservations: &[Reservation]) -> Result<()> {
    for reservation in reservations {
        let level = uow
            .stock_for_update(reservation.product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(reservation.product_id))?;

        validate_level(reservation.product_id, level.available, reservation.quantity)?;

        uow.decrement_stock(reservation.product_id, reservation.quantity)
            .await?;
    }

    Ok(())
}
