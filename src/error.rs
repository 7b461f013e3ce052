use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced synchronously by the alert service facade. None are
/// retried; the caller decides what to do with them.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("failed to fetch current price in order to set alert")]
    PriceUnavailable,

    #[error("target price is equal to current price")]
    InvalidAlert,

    #[error("target price must be a positive number")]
    InvalidPrice,

    #[error("alert already exists")]
    DuplicateAlert,

    #[error("alert cannot be found")]
    AlertNotFound,

    #[error("pair is not supported")]
    UnknownPair,

    #[error("store error: {0}")]
    Store(String),
}

impl IntoResponse for AlertError {
    fn into_response(self) -> Response {
        let status = match self {
            AlertError::InvalidAlert | AlertError::InvalidPrice | AlertError::UnknownPair => {
                StatusCode::BAD_REQUEST
            }
            AlertError::AlertNotFound => StatusCode::NOT_FOUND,
            AlertError::DuplicateAlert => StatusCode::CONFLICT,
            AlertError::PriceUnavailable => StatusCode::BAD_GATEWAY,
            AlertError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
