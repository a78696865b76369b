//! HTTP API for placing orders.
//!
//! Provides the placement endpoint backed by the resilient inventory check,
//! order lookup, health, and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderRepository;
use placement::{EventPublisher, InventoryLookup, PlacementCoordinator, ResilienceConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Coordinator over shared, type-erased collaborators.
pub type AppCoordinator = PlacementCoordinator<
    Arc<dyn OrderRepository>,
    Arc<dyn InventoryLookup>,
    Arc<dyn EventPublisher>,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: Arc<AppCoordinator>,
}

impl AppState {
    /// Builds the state with a single coordinator, and therefore a single
    /// breaker, for every request.
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        inventory: Arc<dyn InventoryLookup>,
        publisher: Arc<dyn EventPublisher>,
        resilience: ResilienceConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            coordinator: Arc::new(PlacementCoordinator::new(
                repository, inventory, publisher, resilience,
            )),
        })
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/order", post(routes::orders::place))
        .route("/api/order/{order_number}", get(routes::orders::get))
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
