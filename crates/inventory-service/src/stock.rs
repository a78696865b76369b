//! In-memory stock table.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use common::SkuCode;
use domain::Availability;

/// Quantity on hand per sku.
#[derive(Debug, Default)]
pub struct StockTable {
    quantities: RwLock<HashMap<SkuCode, u32>>,
}

impl StockTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the demo catalogue: one sku in stock, one sold out.
    pub fn seeded() -> Self {
        Self::with_quantities([("iphone_13", 100), ("iphone_13_red", 0)])
    }

    /// Creates a table from `(sku, quantity)` pairs.
    pub fn with_quantities<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<SkuCode>,
    {
        let quantities = entries
            .into_iter()
            .map(|(sku, quantity)| (sku.into(), quantity))
            .collect();
        Self {
            quantities: RwLock::new(quantities),
        }
    }

    /// Sets the quantity on hand for a sku.
    pub fn set_quantity(&self, sku: impl Into<SkuCode>, quantity: u32) {
        self.quantities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sku.into(), quantity);
    }

    /// Returns the quantity on hand, if the sku is known.
    pub fn quantity(&self, sku: &str) -> Option<u32> {
        self.quantities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sku)
            .copied()
    }

    /// Reports availability for every distinct known sku, in request order.
    /// Unknown skus are left out.
    pub fn is_in_stock(&self, skus: &[SkuCode]) -> Vec<Availability> {
        let quantities = self.quantities.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();

        skus.iter()
            .filter(|sku| seen.insert(sku.as_str()))
            .filter_map(|sku| {
                quantities
                    .get(sku)
                    .map(|quantity| Availability::new(sku.clone(), *quantity > 0))
            })
            .collect()
    }
}
