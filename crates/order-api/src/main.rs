//! Order service entry point.

use std::sync::Arc;

use order_api::AppState;
use order_api::config::Config;
use order_store::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use placement::{BroadcastEventPublisher, HttpInventoryLookup};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Logs every `OrderPlaced` event until the publisher goes away.
fn spawn_event_logger(publisher: &BroadcastEventPublisher) {
    let mut events = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(
                    event_type = event.event_type(),
                    order_number = %event.order_number,
                    total = %event.total_amount,
                    "order event received"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn open_repository(config: &Config) -> Arc<dyn OrderRepository> {
    match &config.database_url {
        Some(url) => {
            let repo = PostgresOrderRepository::connect(url)
                .await
                .expect("failed to connect to database");
            repo.run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order store");
            Arc::new(repo)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory order store");
            Arc::new(InMemoryOrderRepository::new())
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = Config::from_env().expect("invalid configuration");
    config
        .resilience
        .validate()
        .expect("invalid resilience configuration");

    // 2. Initialize tracing
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Wire collaborators
    let repository = open_repository(&config).await;
    let inventory = Arc::new(HttpInventoryLookup::new(config.inventory_url.clone()));
    let publisher = BroadcastEventPublisher::default();
    spawn_event_logger(&publisher);

    let state = AppState::new(repository, inventory, Arc::new(publisher), config.resilience);

    // 5. Build the application
    let app = order_api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, inventory_url = %config.inventory_url, "starting order service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
