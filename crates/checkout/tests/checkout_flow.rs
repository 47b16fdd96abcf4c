//! End-to-end checkout scenarios against the in-memory store.

use checkout::{CheckoutError, CheckoutService};
use common::{ProductId, UserId};
use domain::{Money, Product};
use store::{MemoryStore, ShopStore};

fn setup() -> (CheckoutService<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (CheckoutService::new(store.clone()), store)
}

async fn seed_product(store: &MemoryStore, price_cents: i64, stock: Option<i64>) -> ProductId {
    let product = Product::new(
        ProductId::new(),
        "Widget",
        Money::from_cents(price_cents),
        stock,
    );
    store.insert_product(&product).await.unwrap();
    product.id
}

async fn stock_of(store: &MemoryStore, product_id: ProductId) -> Option<i64> {
    store
        .product(product_id)
        .await
        .unwrap()
        .unwrap()
        .quantity_available
}

#[tokio::test]
async fn two_product_cart_checks_out() {
    let (service, store) = setup();
    let user = UserId::new();
    let product_a = seed_product(&store, 1000, Some(5)).await;
    let product_b = seed_product(&store, 2500, Some(3)).await;

    store.add_cart_line(user, product_a, 2).await.unwrap();
    store.add_cart_line(user, product_b, 1).await.unwrap();

    let order = service.checkout(user).await.unwrap();

    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.total_amount.cents(), 2 * 1000 + 2500);
    assert_eq!(stock_of(&store, product_a).await, Some(3));
    assert_eq!(stock_of(&store, product_b).await, Some(2));
    assert!(store.cart_lines(user).await.unwrap().is_empty());

    // The order is queryable and owned by the user.
    let reloaded = service.order_for_user(order.id, user).await.unwrap().unwrap();
    assert_eq!(reloaded.total_amount, order.total_amount);
}

#[tokio::test]
async fn total_equals_sum_of_frozen_line_prices() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 999, Some(10)).await;
    store.add_cart_line(user, product, 3).await.unwrap();

    let order = service.checkout(user).await.unwrap();

    let computed: i64 = order
        .lines
        .iter()
        .map(|l| l.unit_price_at_purchase.cents() * l.quantity as i64)
        .sum();
    assert_eq!(order.total_amount.cents(), computed);
}

#[tokio::test]
async fn zero_stock_fails_with_unavailable_and_no_mutation() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(0)).await;
    store.add_cart_line(user, product, 1).await.unwrap();

    let result = service.checkout(user).await;

    match result {
        Err(CheckoutError::StockUnavailable { product_id }) => {
            assert_eq!(product_id, product);
        }
        other => panic!("expected StockUnavailable, got {other:?}"),
    }
    assert_eq!(stock_of(&store, product).await, Some(0));
    assert_eq!(store.cart_lines(user).await.unwrap().len(), 1);
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn null_stock_counter_behaves_as_unavailable() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, None).await;
    store.add_cart_line(user, product, 1).await.unwrap();

    let result = service.checkout(user).await;
    assert!(matches!(
        result,
        Err(CheckoutError::StockUnavailable { .. })
    ));
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn short_stock_fails_with_exact_numbers() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(2)).await;
    store.add_cart_line(user, product, 3).await.unwrap();

    let result = service.checkout(user).await;

    match result {
        Err(CheckoutError::StockInsufficient {
            product_id,
            available,
            requested,
        }) => {
            assert_eq!(product_id, product);
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("expected StockInsufficient, got {other:?}"),
    }
    assert_eq!(stock_of(&store, product).await, Some(2));
    assert_eq!(store.cart_lines(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_product_fails_with_not_found() {
    let (service, store) = setup();
    let user = UserId::new();
    // A line referencing a product that was never created.
    let ghost = ProductId::new();
    store.add_cart_line(user, ghost, 1).await.unwrap();

    let result = service.checkout(user).await;
    assert!(matches!(result, Err(CheckoutError::ProductNotFound(id)) if id == ghost));
}

#[tokio::test]
async fn multi_product_failure_leaves_all_stock_untouched() {
    let (service, store) = setup();
    let user = UserId::new();
    let in_stock = seed_product(&store, 1000, Some(5)).await;
    let sold_out = seed_product(&store, 2000, Some(0)).await;

    store.add_cart_line(user, in_stock, 1).await.unwrap();
    store.add_cart_line(user, sold_out, 1).await.unwrap();

    let result = service.checkout(user).await;
    assert!(result.is_err());

    // The in-stock product must not have been decremented.
    assert_eq!(stock_of(&store, in_stock).await, Some(5));
    assert_eq!(stock_of(&store, sold_out).await, Some(0));
    assert_eq!(store.cart_lines(user).await.unwrap().len(), 2);
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn later_price_change_leaves_order_lines_frozen() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(5)).await;
    store.add_cart_line(user, product, 1).await.unwrap();

    let order = service.checkout(user).await.unwrap();
    assert_eq!(order.lines[0].unit_price_at_purchase.cents(), 1000);

    store
        .set_product_price(product, Money::from_cents(9999))
        .await
        .unwrap();

    let reloaded = service.order_for_user(order.id, user).await.unwrap().unwrap();
    assert_eq!(reloaded.lines[0].unit_price_at_purchase.cents(), 1000);
    assert_eq!(reloaded.total_amount.cents(), 1000);
}

#[tokio::test]
async fn repeated_adds_reserve_the_summed_quantity_once() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(5)).await;

    store.add_cart_line(user, product, 2).await.unwrap();
    store.add_cart_line(user, product, 3).await.unwrap();

    let order = service.checkout(user).await.unwrap();

    // One line, quantity 5, stock decremented exactly once.
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].quantity, 5);
    assert_eq!(stock_of(&store, product).await, Some(0));
}

#[tokio::test]
async fn repeated_adds_exceeding_stock_are_rejected_whole() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(4)).await;

    store.add_cart_line(user, product, 2).await.unwrap();
    store.add_cart_line(user, product, 3).await.unwrap();

    let result = service.checkout(user).await;
    assert!(matches!(
        result,
        Err(CheckoutError::StockInsufficient {
            available: 4,
            requested: 5,
            ..
        })
    ));
    assert_eq!(stock_of(&store, product).await, Some(4));
}

#[tokio::test]
async fn last_unit_race_has_exactly_one_winner() {
    let (_, store) = setup();
    let product = seed_product(&store, 1000, Some(1)).await;

    let user_a = UserId::new();
    let user_b = UserId::new();
    store.add_cart_line(user_a, product, 1).await.unwrap();
    store.add_cart_line(user_b, product, 1).await.unwrap();

    let service_a = CheckoutService::new(store.clone());
    let service_b = CheckoutService::new(store.clone());

    let task_a = tokio::spawn(async move { service_a.checkout(user_a).await });
    let task_b = tokio::spawn(async move { service_b.checkout(user_b).await });

    let result_a = task_a.await.unwrap();
    let result_b = task_b.await.unwrap();

    let successes = [&result_a, &result_b]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one checkout must win the last unit");

    let loser = if result_a.is_ok() { result_b } else { result_a };
    assert!(matches!(
        loser,
        Err(CheckoutError::StockUnavailable { .. } | CheckoutError::StockInsufficient { .. })
    ));

    assert_eq!(stock_of(&store, product).await, Some(0));
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn contention_is_retried_then_succeeds() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(5)).await;
    store.add_cart_line(user, product, 1).await.unwrap();

    // Two transient failures, third attempt wins.
    store.fail_contention(2);

    let order = service.checkout(user).await.unwrap();
    assert_eq!(order.total_amount.cents(), 1000);
    assert_eq!(stock_of(&store, product).await, Some(4));
}

#[tokio::test]
async fn contention_exhaustion_fails_transient_and_clean() {
    let (service, store) = setup();
    let user = UserId::new();
    let product = seed_product(&store, 1000, Some(5)).await;
    store.add_cart_line(user, product, 1).await.unwrap();

    store.fail_contention(10);

    let result = service.checkout(user).await;
    assert!(matches!(result, Err(CheckoutError::TransientContention)));

    // Nothing changed.
    assert_eq!(stock_of(&store, product).await, Some(5));
    assert_eq!(store.cart_lines(user).await.unwrap().len(), 1);
    assert_eq!(store.order_count().await, 0);
}
