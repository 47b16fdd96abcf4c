//! Cart line management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CartLineId, ProductId};
use domain::CartLine;
use serde::{Deserialize, Serialize};
use store::ShopStore;

use crate::error::ApiError;
use crate::routes::orders::{AppState, parse_user_id};

// -- Request types --

#[derive(Deserialize)]
pub struct AddCartLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateCartLineRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        CartLineResponse {
            id: line.id.to_string(),
            product_id: line.product_id.to_string(),
            quantity: line.quantity,
        }
    }
}

// -- Handlers --

/// GET /users/:user_id/cart — list the user's cart lines.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let lines = state.checkout.store().cart_lines(user_id).await?;

    Ok(Json(lines.into_iter().map(CartLineResponse::from).collect()))
}

/// POST /users/:user_id/cart — add a product to the cart, merging with
/// an existing line for the same product.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
    Json(req): Json<AddCartLineRequest>,
) -> Result<(axum::http::StatusCode, Json<CartLineResponse>), ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let product_id = parse_product_id(&req.product_id)?;

    if req.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be positive".to_string()));
    }

    let store = state.checkout.store();
    if store.product(product_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Product {product_id} not found")));
    }

    let line = store.add_cart_line(user_id, product_id, req.quantity).await?;

    Ok((axum::http::StatusCode::CREATED, Json(line.into())))
}

/// PUT /users/:user_id/cart/:line_id — replace a cart line's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, line_id)): Path<(String, String)>,
    Json(req): Json<UpdateCartLineRequest>,
) -> Result<Json<CartLineResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let line_id = parse_line_id(&line_id)?;

    if req.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be positive".to_string()));
    }

    let store = state.checkout.store();
    let mut line = owned_line(store, line_id, user_id).await?;

    store.update_cart_line_quantity(line_id, req.quantity).await?;
    line.quantity = req.quantity;

    Ok(Json(line.into()))
}

/// DELETE /users/:user_id/cart/:line_id — remove a cart line.
#[tracing::instrument(skip(state))]
pub async fn remove<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, line_id)): Path<(String, String)>,
) -> Result<axum::http::StatusCode, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let line_id = parse_line_id(&line_id)?;

    let store = state.checkout.store();
    owned_line(store, line_id, user_id).await?;

    store.remove_cart_line(line_id).await?;

    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Loads a cart line and checks that it belongs to the requesting user.
async fn owned_line<S: ShopStore>(
    store: &S,
    line_id: CartLineId,
    user_id: common::UserId,
) -> Result<CartLine, ApiError> {
    let line = store
        .cart_line(line_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart line {line_id} not found")))?;

    if line.user_id != user_id {
        return Err(ApiError::Checkout(checkout::CheckoutError::Unauthorized));
    }

    Ok(line)
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid product ID: {e}")))?;
    Ok(ProductId::from_uuid(uuid))
}

fn parse_line_id(id: &str) -> Result<CartLineId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid cart line ID: {e}")))?;
    Ok(CartLineId::from_uuid(uuid))
}
