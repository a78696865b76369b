//! Order proposal and committed order.

use chrono::{DateTime, Utc};
use common::{OrderNumber, SkuCode};
use serde::{Deserialize, Serialize};

use super::{LineItem, Money, OrderError, OrderState};

/// An order built from a placement request, not yet validated against inventory.
///
/// The order number is fixed at construction and stays the same whatever
/// happens to the remote lookup; a failed placement simply drops the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    order_number: OrderNumber,
    line_items: Vec<LineItem>,
}

impl Order {
    /// Proposes a new order with a freshly generated order number.
    pub fn propose(line_items: Vec<LineItem>) -> Result<Self, OrderError> {
        Self::propose_with_number(OrderNumber::new(), line_items)
    }

    /// Proposes an order with a caller-chosen number.
    pub fn propose_with_number(
        order_number: OrderNumber,
        line_items: Vec<LineItem>,
    ) -> Result<Self, OrderError> {
        if line_items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let mut total = Money::zero();
        for item in &line_items {
            total = item
                .unit_price
                .checked_multiply(item.quantity)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| OrderError::AmountOverflow {
                    sku: item.sku.to_string(),
                })?;
        }

        Ok(Self {
            order_number,
            line_items,
        })
    }

    /// Returns the order number.
    pub fn order_number(&self) -> OrderNumber {
        self.order_number
    }

    /// Returns the line items in request order.
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Returns the sku of every line in request order, repeats included.
    pub fn sku_codes(&self) -> Vec<SkuCode> {
        self.line_items.iter().map(|item| item.sku.clone()).collect()
    }

    /// Returns the sum of all line totals.
    pub fn total_amount(&self) -> Money {
        self.line_items.iter().map(LineItem::total_price).sum()
    }

    /// Returns the current state.
    pub fn state(&self) -> OrderState {
        OrderState::Proposed
    }

    /// Consumes the proposal and marks it committed.
    pub fn commit(self) -> CommittedOrder {
        CommittedOrder {
            order_number: self.order_number,
            line_items: self.line_items,
            committed_at: Utc::now(),
        }
    }
}

/// An order that passed inventory validation.
///
/// This is the only shape that repositories accept, so a proposal can never
/// be written without going through [`Order::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedOrder {
    order_number: OrderNumber,
    line_items: Vec<LineItem>,
    committed_at: DateTime<Utc>,
}

impl CommittedOrder {
    /// Rebuilds a committed order from stored parts.
    pub fn restore(
        order_number: OrderNumber,
        line_items: Vec<LineItem>,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_number,
            line_items,
            committed_at,
        }
    }

    /// Returns the order number.
    pub fn order_number(&self) -> OrderNumber {
        self.order_number
    }

    /// Returns the line items in request order.
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Returns the sum of all line totals.
    pub fn total_amount(&self) -> Money {
        self.line_items.iter().map(LineItem::total_price).sum()
    }

    /// Returns when the order was committed.
    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    /// Returns the current state.
    pub fn state(&self) -> OrderState {
        OrderState::Committed
    }
}
