//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout or order-access error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({ "error": { "kind": kind, "detail": detail } });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, &'static str, String) {
    let detail = err.to_string();
    match err {
        CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, "empty_cart", detail),
        CheckoutError::ProductNotFound(_) => (StatusCode::NOT_FOUND, "product_not_found", detail),
        CheckoutError::StockUnavailable { .. } => {
            (StatusCode::CONFLICT, "stock_unavailable", detail)
        }
        CheckoutError::StockInsufficient { .. } => {
            (StatusCode::CONFLICT, "stock_insufficient", detail)
        }
        CheckoutError::TransientContention => {
            (StatusCode::SERVICE_UNAVAILABLE, "transient_contention", detail)
        }
        CheckoutError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized", detail),
        CheckoutError::Storage(_) => {
            tracing::error!(error = %detail, "storage failure during request");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal", detail)
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<store::StorageError> for ApiError {
    fn from(err: store::StorageError) -> Self {
        ApiError::Checkout(CheckoutError::Storage(err))
    }
}
