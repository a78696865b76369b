//! Outbound `OrderPlaced` notifications.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use domain::OrderPlaced;
use tokio::sync::broadcast;

/// Publishes order events. Fire-and-forget: delivery problems are logged by
/// the implementation and never reach the placement pipeline.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: OrderPlaced);
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, event: OrderPlaced) {
        (**self).publish(event).await
    }
}

/// Fans events out to in-process subscribers over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<OrderPlaced>,
}

impl BroadcastEventPublisher {
    /// Creates a publisher whose subscribers may lag by up to `capacity` events.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderPlaced> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: OrderPlaced) {
        let order_number = event.order_number;
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(%order_number, receivers, "OrderPlaced published")
            }
            Err(_) => tracing::debug!(%order_number, "OrderPlaced published with no subscribers"),
        }
        metrics::counter!("order_events_published_total").increment(1);
    }
}

/// Keeps published events in memory for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<OrderPlaced>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far, oldest first.
    pub fn events(&self) -> Vec<OrderPlaced> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: OrderPlaced) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
