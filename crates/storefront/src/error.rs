//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Responses are JSON envelopes so the UI collaborator can render inline
//! messages without scraping status text.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use taraba_checkout::CheckoutError;
use thiserror::Error;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// The checkout engine refused the operation.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture infrastructure failures to Sentry; user-correctable
        // outcomes (missing fields, rejected orders) stay out of it.
        if matches!(
            self,
            Self::Internal(_) | Self::Checkout(CheckoutError::Upstream(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = match &self {
            Self::Checkout(CheckoutError::MissingFields(fields)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "missing_fields",
                    "fields": fields,
                }),
            ),
            Self::Checkout(CheckoutError::OrderRejected(message)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "order_rejected",
                    "message": message,
                }),
            ),
            // Don't expose upstream details to clients
            Self::Checkout(CheckoutError::Upstream(_)) => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": "upstream_unavailable",
                    "message": "pricing service unavailable, please retry",
                }),
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "bad_request", "message": message }),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": what }),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal", "message": "internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
