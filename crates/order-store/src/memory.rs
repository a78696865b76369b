use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::OrderNumber;
use domain::CommittedOrder;
use tokio::sync::RwLock;

use crate::{OrderRepository, Result, StoreError};

/// In-memory order repository.
///
/// Holds orders in a map behind a single lock, so a `save` is observed
/// either entirely or not at all. Cloning shares the underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderNumber, CommittedOrder>>>,
    save_attempts: Arc<AtomicUsize>,
    fail_on_save: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times `save` has been called, including failed calls.
    pub fn save_count(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `save` fail until switched off again.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &CommittedOrder) -> Result<()> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store configured to fail".to_string(),
            ));
        }

        let mut orders = self.orders.write().await;
        let order_number = order.order_number();

        if orders.contains_key(&order_number) {
            return Err(StoreError::DuplicateOrder(order_number));
        }

        orders.insert(order_number, order.clone());
        metrics::counter!("orders_saved_total", "store" => "memory").increment(1);
        tracing::debug!(%order_number, lines = order.line_items().len(), "order saved");

        Ok(())
    }

    async fn find(&self, order_number: OrderNumber) -> Result<Option<CommittedOrder>> {
        Ok(self.orders.read().await.get(&order_number).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.orders.read().await.len())
    }
}
