//! Domain layer for order placement.
//!
//! This crate provides:
//! - The order proposal and committed order types with line-item validation
//! - The `OrderPlaced` domain event
//! - Availability results and the fail-closed aggregation over them
//! - `PlacementOutcome`, the three-way result returned to callers

pub mod availability;
pub mod order;
pub mod outcome;

pub use availability::{Availability, AvailabilityMap, all_available, unavailable_skus};
pub use common::{OrderNumber, SkuCode};
pub use order::{
    CommittedOrder, LineItem, Money, Order, OrderError, OrderPlaced, OrderState, ParseMoneyError,
};
pub use outcome::{DegradedCause, PlacementOutcome, RejectionReason, ServiceDegraded};
