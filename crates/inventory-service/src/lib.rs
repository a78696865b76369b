//! Inventory service: answers "which of these skus are in stock?".
//!
//! A passive responder over an in-memory stock table. Skus it has never
//! heard of are left out of the answer, and callers treat them as
//! unavailable.

pub mod config;
pub mod routes;
pub mod stock;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use stock::StockTable;

/// Creates the Axum application router.
pub fn create_app(stock: Arc<StockTable>) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/inventory", get(routes::inventory::is_in_stock))
        .with_state(stock)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
