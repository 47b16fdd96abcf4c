//! HTTP API server for the shop backend.
//!
//! Exposes checkout, cart management, and order history over REST,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use checkout::CheckoutService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::ShopStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ShopStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users/{user_id}/cart", get(routes::cart::list::<S>))
        .route("/users/{user_id}/cart", post(routes::cart::add::<S>))
        .route(
            "/users/{user_id}/cart/{line_id}",
            put(routes::cart::update::<S>),
        )
        .route(
            "/users/{user_id}/cart/{line_id}",
            delete(routes::cart::remove::<S>),
        )
        .route("/users/{user_id}/checkout", post(routes::orders::checkout::<S>))
        .route("/users/{user_id}/orders", get(routes::orders::list::<S>))
        .route(
            "/users/{user_id}/orders/{order_id}",
            get(routes::orders::get::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given store.
pub fn create_state<S: ShopStore>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        checkout: CheckoutService::new(store),
    })
}
