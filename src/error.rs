//! Service error type with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart item not found")]
    CartItemNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Invalid shipping address: {0}")]
    InvalidAddress(validator::ValidationErrors),

    #[error("Insufficient stock for {product} (available: {available})")]
    InsufficientStock { product: String, available: i32 },

    #[error("{0} is no longer for sale")]
    ProductInactive(String),

    #[error("Cart is empty")]
    CartEmpty,

    #[error("Payment amount does not match the order total")]
    AmountMismatch,

    #[error("Order has already been processed")]
    AlreadyProcessed,

    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Stable machine-readable kind, independent of the display message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AuthRequired => "auth_required",
            Error::ProductNotFound => "product_not_found",
            Error::CartItemNotFound => "cart_item_not_found",
            Error::OrderNotFound => "order_not_found",
            Error::InvalidQuantity => "invalid_quantity",
            Error::InvalidAddress(_) => "invalid_address",
            Error::InsufficientStock { .. } => "insufficient_stock",
            Error::ProductInactive(_) => "product_inactive",
            Error::CartEmpty => "cart_empty",
            Error::AmountMismatch => "amount_mismatch",
            Error::AlreadyProcessed => "already_processed",
            Error::Database(_) => "storage",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::AuthRequired => StatusCode::UNAUTHORIZED,
            Error::ProductNotFound | Error::CartItemNotFound | Error::OrderNotFound => {
                StatusCode::NOT_FOUND
            }
            Error::InvalidQuantity | Error::InvalidAddress(_) | Error::CartEmpty => {
                StatusCode::BAD_REQUEST
            }
            Error::InsufficientStock { .. }
            | Error::ProductInactive(_)
            | Error::AmountMismatch
            | Error::AlreadyProcessed => StatusCode::CONFLICT,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
        }
        let body = serde_json::json!({
            "error": { "kind": self.kind(), "message": self.to_string() }
        });
        (status, Json(body)).into_response()
    }
}
