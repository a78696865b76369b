//! Order domain events.

use chrono::{DateTime, Utc};
use common::OrderNumber;
use serde::{Deserialize, Serialize};

use super::{CommittedOrder, Money};

/// Emitted once per order, after the order has been durably persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    /// The committed order's number.
    pub order_number: OrderNumber,

    /// Sum of all line totals.
    pub total_amount: Money,

    /// Number of line items in the order.
    pub line_count: usize,

    /// When the order was committed.
    pub placed_at: DateTime<Utc>,
}

impl OrderPlaced {
    /// Builds the event for a committed order.
    pub fn for_order(order: &CommittedOrder) -> Self {
        Self {
            order_number: order.order_number(),
            total_amount: order.total_amount(),
            line_count: order.line_items().len(),
            placed_at: order.committed_at(),
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        "OrderPlaced"
    }
}
