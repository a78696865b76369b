//! Result of a placement attempt as seen by the caller.

use common::{OrderNumber, SkuCode};
use serde::{Deserialize, Serialize};

/// Outcome of placing an order.
///
/// Exactly one of three things happened: the order was committed, inventory
/// said no, or inventory could not be consulted reliably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PlacementOutcome {
    /// The order was persisted and an `OrderPlaced` event was published.
    #[serde(rename_all = "camelCase")]
    Committed { order_number: OrderNumber },

    /// Inventory answered, and at least one item is not available.
    Rejected(RejectionReason),

    /// Inventory could not be consulted; nothing was persisted.
    Unavailable(ServiceDegraded),
}

impl PlacementOutcome {
    /// Convenience constructor for a committed outcome.
    pub fn committed(order_number: OrderNumber) -> Self {
        PlacementOutcome::Committed { order_number }
    }

    /// Returns true if the order was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, PlacementOutcome::Committed { .. })
    }

    /// Returns the number assigned to the proposal, when one was built.
    pub fn order_number(&self) -> Option<OrderNumber> {
        match self {
            PlacementOutcome::Committed { order_number } => Some(*order_number),
            PlacementOutcome::Rejected(reason) => Some(reason.order_number),
            PlacementOutcome::Unavailable(_) => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PlacementOutcome::Committed { .. } => "committed",
            PlacementOutcome::Rejected(_) => "rejected",
            PlacementOutcome::Unavailable(_) => "unavailable",
        }
    }
}

/// Why inventory turned the order down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionReason {
    /// Number of the discarded proposal.
    pub order_number: OrderNumber,

    /// Skus that were out of stock or unknown to inventory.
    pub unavailable: Vec<SkuCode>,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let skus: Vec<&str> = self.unavailable.iter().map(SkuCode::as_str).collect();
        write!(
            f,
            "Product is not in stock, please try again later ({})",
            skus.join(", ")
        )
    }
}

/// Inventory could not be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDegraded {
    pub cause: DegradedCause,
}

impl ServiceDegraded {
    /// Creates a degraded marker with the given cause.
    pub fn new(cause: DegradedCause) -> Self {
        Self { cause }
    }
}

/// What stopped the inventory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedCause {
    /// The circuit breaker is open and failed fast.
    CircuitOpen,
    /// Every attempt ran past its deadline.
    TimedOut,
    /// Transient failures used up the retry budget.
    RetriesExhausted,
    /// Inventory returned a well-formed error response.
    RemoteError,
}

impl DegradedCause {
    /// Returns the cause as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedCause::CircuitOpen => "circuit_open",
            DegradedCause::TimedOut => "timed_out",
            DegradedCause::RetriesExhausted => "retries_exhausted",
            DegradedCause::RemoteError => "remote_error",
        }
    }
}

impl std::fmt::Display for DegradedCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let number = OrderNumber::new();
        assert_eq!(PlacementOutcome::committed(number).label(), "committed");
        assert_eq!(
            PlacementOutcome::Rejected(RejectionReason {
                order_number: number,
                unavailable: vec![],
            })
            .label(),
            "rejected"
        );
        assert_eq!(
            PlacementOutcome::Unavailable(ServiceDegraded::new(DegradedCause::TimedOut)).label(),
            "unavailable"
        );
    }

    #[test]
    fn test_order_number_accessor() {
        let number = OrderNumber::new();
        assert_eq!(PlacementOutcome::committed(number).order_number(), Some(number));
        assert_eq!(
            PlacementOutcome::Unavailable(ServiceDegraded::new(DegradedCause::CircuitOpen))
                .order_number(),
            None
        );
    }

    #[test]
    fn test_rejection_message_lists_skus() {
        let reason = RejectionReason {
            order_number: OrderNumber::new(),
            unavailable: vec![SkuCode::new("sku-A"), SkuCode::new("sku-B")],
        };
        assert_eq!(
            reason.to_string(),
            "Product is not in stock, please try again later (sku-A, sku-B)"
        );
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let outcome =
            PlacementOutcome::Unavailable(ServiceDegraded::new(DegradedCause::RetriesExhausted));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["cause"], "retries_exhausted");
    }
}
