//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::CheckoutService;
use common::{OrderId, UserId};
use domain::Order;
use serde::Serialize;
use store::ShopStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ShopStore> {
    pub checkout: CheckoutService<S>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub created_at: String,
    pub total_cents: i64,
    pub lines: Vec<OrderLineResponse>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let lines = order
            .lines
            .iter()
            .map(|line| OrderLineResponse {
                product_id: line.product_id.map(|id| id.to_string()),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_at_purchase.cents(),
            })
            .collect();

        OrderResponse {
            order_id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            created_at: order.created_at.to_rfc3339(),
            total_cents: order.total_amount.cents(),
            lines,
        }
    }
}

// -- Handlers --

/// POST /users/:user_id/checkout — convert the user's cart into an order.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let order = state.checkout.checkout(user_id).await?;

    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /users/:user_id/orders — list the user's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let orders = state.checkout.orders_for_user(user_id).await?;

    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /users/:user_id/orders/:order_id — load one order, enforcing
/// ownership.
#[tracing::instrument(skip(state))]
pub async fn get<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, order_id)): Path<(String, String)>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let order_id = parse_order_id(&order_id)?;

    let order = state
        .checkout
        .order_for_user(order_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;

    Ok(Json(order.into()))
}

pub(crate) fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user ID: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
