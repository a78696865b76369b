//! Placement pipeline: guarded lookup, aggregation, commit decision.

use std::sync::Arc;

use common::SkuCode;
use domain::{
    AvailabilityMap, DegradedCause, Order, OrderPlaced, PlacementOutcome, RejectionReason,
    ServiceDegraded, all_available, unavailable_skus,
};
use order_store::OrderRepository;

use crate::error::{LookupError, PlacementError, Result};
use crate::events::EventPublisher;
use crate::handle::PlacementHandle;
use crate::request::PlaceOrderRequest;
use crate::resilience::{BreakerSnapshot, ResilienceConfig, ResilienceController};
use crate::services::inventory::InventoryLookup;

/// Result of consulting inventory for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Every requested sku is known and in stock.
    Available,
    /// Inventory answered; these skus are out of stock or unknown.
    Unavailable(Vec<SkuCode>),
    /// Inventory could not be consulted.
    Degraded(DegradedCause),
}

/// Places orders against a guarded inventory lookup.
///
/// One coordinator should serve every placement in the process so all of
/// them share the same breaker.
pub struct PlacementCoordinator<R, L, P>
where
    R: OrderRepository,
    L: InventoryLookup,
    P: EventPublisher,
{
    repository: R,
    inventory: L,
    publisher: P,
    controller: ResilienceController,
}

impl<R, L, P> PlacementCoordinator<R, L, P>
where
    R: OrderRepository,
    L: InventoryLookup,
    P: EventPublisher,
{
    /// Creates a new coordinator with a closed breaker.
    pub fn new(repository: R, inventory: L, publisher: P, config: ResilienceConfig) -> Self {
        Self {
            repository,
            inventory,
            publisher,
            controller: ResilienceController::new(config),
        }
    }

    /// Returns the order repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the breaker's current state and window.
    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.controller.breaker().snapshot()
    }

    /// Runs the guarded lookup for an order and reduces the answer.
    ///
    /// Never fails: guard failures come back as [`Validation::Degraded`].
    pub async fn validate(&self, order: &Order) -> Validation {
        let requested = order.sku_codes();
        let requested = requested.as_slice();
        let inventory = &self.inventory;

        self.controller
            .call_with_fallback(
                move || async move {
                    let responses = inventory.check(requested).await?;
                    let map: AvailabilityMap = responses.into_iter().collect();
                    Ok::<_, LookupError>(if all_available(&map, requested) {
                        Validation::Available
                    } else {
                        Validation::Unavailable(unavailable_skus(&map, requested))
                    })
                },
                |error| Validation::Degraded(error.degraded_cause()),
            )
            .await
    }

    /// Commits or discards the order according to `validation`.
    ///
    /// Makes a single pass. On commit the order is saved in one atomic write
    /// and only then is `OrderPlaced` published.
    pub async fn decide(&self, order: Order, validation: Validation) -> Result<PlacementOutcome> {
        let order_number = order.order_number();

        match validation {
            Validation::Available => {
                let committed = order.commit();
                self.repository.save(&committed).await.inspect_err(|e| {
                    tracing::error!(%order_number, error = %e, "failed to persist order");
                })?;
                self.publisher
                    .publish(OrderPlaced::for_order(&committed))
                    .await;
                tracing::info!(%order_number, total = %committed.total_amount(), "order placed");
                Ok(PlacementOutcome::committed(order_number))
            }
            Validation::Unavailable(unavailable) => {
                let reason = RejectionReason {
                    order_number,
                    unavailable,
                };
                tracing::info!(%order_number, %reason, "order rejected");
                Ok(PlacementOutcome::Rejected(reason))
            }
            Validation::Degraded(cause) => {
                tracing::warn!(%order_number, %cause, "inventory unavailable, order discarded");
                Ok(PlacementOutcome::Unavailable(ServiceDegraded::new(cause)))
            }
        }
    }

    /// Runs the whole pipeline on the current task.
    #[tracing::instrument(skip_all, fields(lines = request.items.len()))]
    pub async fn place(&self, request: PlaceOrderRequest) -> Result<PlacementOutcome> {
        let started = std::time::Instant::now();

        let result = self.run(request).await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(PlacementError::Order(_)) => "invalid",
            Err(_) => "error",
        };
        metrics::counter!("order_placements_total", "outcome" => label).increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, request: PlaceOrderRequest) -> Result<PlacementOutcome> {
        let order = request.into_order()?;
        tracing::debug!(order_number = %order.order_number(), "order proposed");

        let validation = self.validate(&order).await;
        self.decide(order, validation).await
    }
}

impl<R, L, P> PlacementCoordinator<R, L, P>
where
    R: OrderRepository + 'static,
    L: InventoryLookup + 'static,
    P: EventPublisher + 'static,
{
    /// Runs the pipeline on its own task and returns a handle to its outcome.
    pub fn place_async(self: &Arc<Self>, request: PlaceOrderRequest) -> PlacementHandle {
        let coordinator = Arc::clone(self);
        PlacementHandle::spawn(async move { coordinator.place(request).await })
    }
}
