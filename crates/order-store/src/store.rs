use std::sync::Arc;

use async_trait::async_trait;
use common::OrderNumber;
use domain::CommittedOrder;

use crate::Result;

/// Storage port for committed orders.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists an order and all its line items as a single atomic write.
    ///
    /// Fails with `DuplicateOrder` if an order with the same number exists;
    /// in that case nothing is written.
    async fn save(&self, order: &CommittedOrder) -> Result<()>;

    /// Loads a committed order by number.
    async fn find(&self, order_number: OrderNumber) -> Result<Option<CommittedOrder>>;

    /// Returns the number of stored orders.
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    async fn save(&self, order: &CommittedOrder) -> Result<()> {
        (**self).save(order).await
    }

    async fn find(&self, order_number: OrderNumber) -> Result<Option<CommittedOrder>> {
        (**self).find(order_number).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}
