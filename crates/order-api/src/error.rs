//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::StoreError;
use placement::PlacementError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Placement pipeline error.
    Placement(PlacementError),
    /// Order store error outside a placement.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Placement(err) => placement_error_to_response(err),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "order store error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn placement_error_to_response(err: PlacementError) -> (StatusCode, String) {
    match &err {
        PlacementError::Order(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        PlacementError::Store(_) | PlacementError::TaskAborted(_) => {
            tracing::error!(error = %err, "placement failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
