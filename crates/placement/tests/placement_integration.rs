//! End-to-end placement scenarios against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use common::SkuCode;
use domain::{DegradedCause, Money, OrderError, PlacementOutcome, ServiceDegraded};
use order_store::{InMemoryOrderRepository, OrderRepository};
use placement::{
    CircuitBreakerConfig, CircuitState, InMemoryEventPublisher, InMemoryInventoryLookup,
    LineItemRequest, LookupError, PlaceOrderRequest, PlacementCoordinator, PlacementError,
    ResilienceConfig,
};

type TestCoordinator =
    PlacementCoordinator<InMemoryOrderRepository, InMemoryInventoryLookup, InMemoryEventPublisher>;

struct TestHarness {
    coordinator: Arc<TestCoordinator>,
    inventory: InMemoryInventoryLookup,
    repository: InMemoryOrderRepository,
    events: InMemoryEventPublisher,
}

impl TestHarness {
    /// Retry bound 2, 3s deadline, breaker opening at half of 4 calls.
    fn new() -> Self {
        Self::with_config(
            ResilienceConfig::default()
                .with_timeout(Duration::from_secs(3))
                .with_retry(2, Duration::from_millis(100))
                .with_breaker(CircuitBreakerConfig {
                    window_size: 4,
                    minimum_calls: 4,
                    failure_ratio: 0.5,
                    cooldown: Duration::from_secs(5),
                    half_open_calls: 1,
                }),
        )
    }

    fn with_config(config: ResilienceConfig) -> Self {
        let inventory = InMemoryInventoryLookup::new();
        let repository = InMemoryOrderRepository::new();
        let events = InMemoryEventPublisher::new();

        let coordinator = Arc::new(PlacementCoordinator::new(
            repository.clone(),
            inventory.clone(),
            events.clone(),
            config,
        ));

        Self {
            coordinator,
            inventory,
            repository,
            events,
        }
    }

    /// No retries, so each placement is exactly one breaker outcome.
    fn without_retries() -> Self {
        Self::with_config(
            ResilienceConfig::default()
                .with_retry(0, Duration::ZERO)
                .with_breaker(CircuitBreakerConfig {
                    window_size: 4,
                    minimum_calls: 4,
                    failure_ratio: 0.5,
                    cooldown: Duration::from_secs(5),
                    half_open_calls: 1,
                }),
        )
    }

    async fn place(&self, lines: &[(&str, &str, u32)]) -> PlacementOutcome {
        self.coordinator.place(request(lines)).await.unwrap()
    }

    async fn orders_persisted(&self) -> usize {
        self.repository.count().await.unwrap()
    }
}

fn request(lines: &[(&str, &str, u32)]) -> PlaceOrderRequest {
    PlaceOrderRequest::new(
        lines
            .iter()
            .map(|(sku, price, quantity)| {
                LineItemRequest::new(*sku, Money::parse_decimal(price).unwrap(), *quantity)
            })
            .collect(),
    )
}

fn refused() -> LookupError {
    LookupError::RemoteUnavailable("connection refused".into())
}

fn degraded(cause: DegradedCause) -> PlacementOutcome {
    PlacementOutcome::Unavailable(ServiceDegraded::new(cause))
}

mod decisions {
    use super::*;

    #[tokio::test]
    async fn in_stock_order_commits_and_emits_one_event() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);

        let outcome = h.place(&[("sku-A", "10.00", 2)]).await;

        let order_number = match outcome {
            PlacementOutcome::Committed { order_number } => order_number,
            other => panic!("expected commit, got {other:?}"),
        };
        let events = h.events.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_number, order_number);
        assert_eq!(events[0].total_amount, Money::from_cents(2000));

        let stored = h.repository.find(order_number).await.unwrap().unwrap();
        assert_eq!(stored.line_items().len(), 1);
        assert_eq!(h.inventory.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_inventory_answer_rejects() {
        let h = TestHarness::new();

        let outcome = h.place(&[("sku-B", "5.00", 1)]).await;

        let reason = match outcome {
            PlacementOutcome::Rejected(reason) => reason,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert_eq!(reason.unavailable, vec![SkuCode::new("sku-B")]);
        assert_eq!(h.events.count(), 0);
        assert_eq!(h.repository.save_count(), 0);
    }

    #[tokio::test]
    async fn one_out_of_stock_line_rejects_whole_order() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.inventory.set_stock("sku-B", false);

        let outcome = h
            .place(&[("sku-A", "10.00", 1), ("sku-B", "5.00", 1), ("sku-A", "10.00", 3)])
            .await;

        assert!(matches!(outcome, PlacementOutcome::Rejected(ref r) if r.unavailable == vec![SkuCode::new("sku-B")]));
        assert_eq!(h.orders_persisted().await, 0);
        assert_eq!(h.events.count(), 0);
    }

    #[tokio::test]
    async fn rejection_is_not_a_breaker_failure() {
        let h = TestHarness::without_retries();

        for _ in 0..10 {
            let outcome = h.place(&[("sku-unknown", "1.00", 1)]).await;
            assert!(matches!(outcome, PlacementOutcome::Rejected(_)));
        }

        let snapshot = h.coordinator.breaker_snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failed_calls, 0);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_inventory() {
        let h = TestHarness::new();

        let empty = h.coordinator.place(PlaceOrderRequest::default()).await;
        assert!(matches!(empty, Err(PlacementError::Order(_))));

        let zero_quantity = h.coordinator.place(request(&[("sku-A", "1.00", 0)])).await;
        assert!(matches!(zero_quantity, Err(PlacementError::Order(_))));

        assert_eq!(h.inventory.call_count(), 0);
    }

    #[tokio::test]
    async fn overflowing_total_is_invalid_before_any_lookup() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);

        let result = h
            .coordinator
            .place_async(request(&[("sku-A", "50000000000000000.00", 2)]))
            .await;

        assert!(matches!(
            result,
            Err(PlacementError::Order(OrderError::AmountOverflow { .. }))
        ));
        assert_eq!(h.inventory.call_count(), 0);
        assert_eq!(h.orders_persisted().await, 0);
        assert_eq!(h.events.count(), 0);
    }

    #[tokio::test]
    async fn large_order_within_range_commits_and_publishes() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);

        let outcome = h.place(&[("sku-A", "40000000000000000.00", 2)]).await;

        assert!(matches!(outcome, PlacementOutcome::Committed { .. }));
        assert_eq!(h.orders_persisted().await, 1);
        let events = h.events.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].total_amount.cents(), 8_000_000_000_000_000_000);
    }

    #[tokio::test]
    async fn store_failure_is_an_error_and_publishes_nothing() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.repository.set_fail_on_save(true);

        let result = h.coordinator.place(request(&[("sku-A", "10.00", 1)])).await;

        assert!(matches!(result, Err(PlacementError::Store(_))));
        assert_eq!(h.events.count(), 0);
        assert_eq!(h.orders_persisted().await, 0);
    }
}

mod resilience {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn three_timeouts_with_retry_bound_two_degrade() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.inventory
            .set_response_delay(Some(Duration::from_secs(10)));

        let outcome = h.place(&[("sku-A", "10.00", 2)]).await;

        assert_eq!(outcome, degraded(DegradedCause::TimedOut));
        assert_eq!(h.inventory.call_count(), 3);
        assert_eq!(h.repository.save_count(), 0);
        assert_eq!(h.events.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_within_bound_still_commit() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.inventory.fail_next(2, refused());

        let outcome = h.place(&[("sku-A", "10.00", 1)]).await;

        assert!(outcome.is_committed());
        assert_eq!(h.inventory.call_count(), 3);
        assert_eq!(h.events.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn definitive_error_degrades_without_retry() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.inventory
            .fail_next(1, LookupError::RemoteError("500 Internal Server Error".into()));

        let outcome = h.place(&[("sku-A", "10.00", 1)]).await;

        assert_eq!(outcome, degraded(DegradedCause::RemoteError));
        assert_eq!(h.inventory.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_breaker_fails_fast_without_calling_inventory() {
        let h = TestHarness::without_retries();
        h.inventory.set_always_fail(Some(refused()));

        for _ in 0..4 {
            let outcome = h.place(&[("sku-A", "10.00", 1)]).await;
            assert_eq!(outcome, degraded(DegradedCause::RetriesExhausted));
        }
        assert_eq!(h.coordinator.breaker_snapshot().state, CircuitState::Open);
        assert_eq!(h.inventory.call_count(), 4);

        for _ in 0..5 {
            let outcome = h.place(&[("sku-A", "10.00", 1)]).await;
            assert_eq!(outcome, degraded(DegradedCause::CircuitOpen));
        }
        assert_eq!(h.inventory.call_count(), 4);
        assert_eq!(h.orders_persisted().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_recovers_after_cooldown() {
        let h = TestHarness::without_retries();
        h.inventory.set_stock("sku-A", true);
        h.inventory.set_always_fail(Some(refused()));
        for _ in 0..4 {
            h.place(&[("sku-A", "10.00", 1)]).await;
        }
        assert_eq!(h.coordinator.breaker_snapshot().state, CircuitState::Open);

        h.inventory.set_always_fail(None);
        tokio::time::advance(Duration::from_secs(5)).await;

        let outcome = h.place(&[("sku-A", "10.00", 1)]).await;
        assert!(outcome.is_committed());
        assert_eq!(h.coordinator.breaker_snapshot().state, CircuitState::Closed);

        for _ in 0..20 {
            assert!(h.place(&[("sku-A", "10.00", 1)]).await.is_committed());
        }
        assert_eq!(h.coordinator.breaker_snapshot().state, CircuitState::Closed);
        assert_eq!(h.orders_persisted().await, 21);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_breaker() {
        let h = TestHarness::without_retries();
        h.inventory.set_always_fail(Some(refused()));
        for _ in 0..4 {
            h.place(&[("sku-A", "10.00", 1)]).await;
        }

        tokio::time::advance(Duration::from_secs(5)).await;
        let outcome = h.place(&[("sku-A", "10.00", 1)]).await;
        assert_eq!(outcome, degraded(DegradedCause::RetriesExhausted));
        assert_eq!(h.inventory.call_count(), 5);
        assert_eq!(h.coordinator.breaker_snapshot().state, CircuitState::Open);

        let outcome = h.place(&[("sku-A", "10.00", 1)]).await;
        assert_eq!(outcome, degraded(DegradedCause::CircuitOpen));
        assert_eq!(h.inventory.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_feed_the_breaker_window() {
        let h = TestHarness::new();
        h.inventory.set_always_fail(Some(refused()));

        // Three attempts from the first placement, one from the second; the
        // fourth failure opens the breaker and cuts the second's retries.
        let first = h.place(&[("sku-A", "10.00", 1)]).await;
        let second = h.place(&[("sku-A", "10.00", 1)]).await;

        assert_eq!(first, degraded(DegradedCause::RetriesExhausted));
        assert_eq!(second, degraded(DegradedCause::CircuitOpen));
        assert_eq!(h.inventory.call_count(), 4);
    }
}

mod async_boundary {
    use super::*;

    #[tokio::test]
    async fn handle_resolves_to_outcome() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);

        let handle = h.coordinator.place_async(request(&[("sku-A", "10.00", 2)]));
        let outcome = handle.await.unwrap();

        assert!(outcome.is_committed());
        assert_eq!(h.events.count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_placements_are_independent() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.inventory.set_stock("sku-B", false);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let sku = if i % 2 == 0 { "sku-A" } else { "sku-B" };
                h.coordinator.place_async(request(&[(sku, "1.00", 1)]))
            })
            .collect();

        let outcomes = futures_util::future::join_all(handles).await;

        let committed = outcomes
            .iter()
            .filter(|o| o.as_ref().unwrap().is_committed())
            .count();
        assert_eq!(committed, 10);
        assert_eq!(h.orders_persisted().await, 10);
        assert_eq!(h.events.count(), 10);

        let mut numbers: Vec<_> = h.events.events().iter().map(|e| e.order_number).collect();
        numbers.sort_by_key(|n| n.as_uuid());
        numbers.dedup();
        assert_eq!(numbers.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_placement_leaves_nothing_behind() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);
        h.inventory.set_response_delay(Some(Duration::from_secs(1)));

        let handle = h.coordinator.place_async(request(&[("sku-A", "10.00", 1)]));
        handle.abort();

        assert!(matches!(handle.await, Err(PlacementError::TaskAborted(_))));
        assert_eq!(h.orders_persisted().await, 0);
        assert_eq!(h.events.count(), 0);
    }

    #[tokio::test]
    async fn dropped_handle_still_completes() {
        let h = TestHarness::new();
        h.inventory.set_stock("sku-A", true);

        drop(h.coordinator.place_async(request(&[("sku-A", "10.00", 1)])));

        for _ in 0..100 {
            if h.events.count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.orders_persisted().await, 1);
        assert_eq!(h.events.count(), 1);
    }
}
