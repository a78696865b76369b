//! Caller-supplied placement input.

use common::SkuCode;
use domain::{LineItem, Money, Order, OrderError};
use serde::{Deserialize, Serialize};

/// One requested line. The caller never supplies an order number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub sku: SkuCode,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItemRequest {
    pub fn new(sku: impl Into<SkuCode>, unit_price: Money, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            unit_price,
            quantity,
        }
    }
}

/// A request to place an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<LineItemRequest>,
}

impl PlaceOrderRequest {
    pub fn new(items: Vec<LineItemRequest>) -> Self {
        Self { items }
    }

    /// Validates the lines and builds a proposal with a fresh order number.
    pub fn into_order(self) -> Result<Order, OrderError> {
        let items = self
            .items
            .into_iter()
            .map(|item| LineItem::new(item.sku, item.unit_price, item.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        Order::propose(items)
    }
}
