//! Order placement with resilient inventory validation.
//!
//! A placement runs these steps:
//! 1. Build a proposal with a fresh order number
//! 2. Ask inventory about every sku through the resilience controller
//! 3. Reduce the answer to available / unavailable / degraded
//! 4. Commit (save, then publish `OrderPlaced`) or discard the proposal
//!
//! Remote failures never escape as errors; they surface as
//! `PlacementOutcome::Unavailable`.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod handle;
pub mod request;
pub mod resilience;
pub mod services;

pub use coordinator::{PlacementCoordinator, Validation};
pub use error::{GuardError, LookupError, PlacementError};
pub use events::{BroadcastEventPublisher, EventPublisher, InMemoryEventPublisher};
pub use handle::PlacementHandle;
pub use request::{LineItemRequest, PlaceOrderRequest};
pub use resilience::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState, ResilienceConfig,
    ResilienceController, RetryPolicy, TimeoutPolicy,
};
pub use services::{HttpInventoryLookup, InMemoryInventoryLookup, InventoryLookup};
