//! Stock availability results and their reduction to a single decision.

use std::collections::HashMap;

use common::SkuCode;
use serde::{Deserialize, Serialize};

/// Availability of a single sku as reported by inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Availability {
    /// The sku the answer is for.
    #[serde(rename = "skuCode")]
    pub sku: SkuCode,

    /// Whether the sku can be ordered right now.
    #[serde(rename = "isInStock")]
    pub in_stock: bool,
}

impl Availability {
    /// Creates a new availability result.
    pub fn new(sku: impl Into<SkuCode>, in_stock: bool) -> Self {
        Self {
            sku: sku.into(),
            in_stock,
        }
    }
}

/// Mapping from each reported sku to its availability.
///
/// Skus the inventory has no record of are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityMap {
    entries: HashMap<SkuCode, bool>,
}

impl AvailabilityMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded availability for a sku, if any.
    pub fn get(&self, sku: &str) -> Option<bool> {
        self.entries.get(sku).copied()
    }

    /// Returns the number of distinct skus reported.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Availability> for AvailabilityMap {
    /// Builds a map from lookup results. A sku reported more than once is
    /// only available if every report says so.
    fn from_iter<I: IntoIterator<Item = Availability>>(iter: I) -> Self {
        let mut entries: HashMap<SkuCode, bool> = HashMap::new();
        for availability in iter {
            entries
                .entry(availability.sku)
                .and_modify(|in_stock| *in_stock &= availability.in_stock)
                .or_insert(availability.in_stock);
        }
        Self { entries }
    }
}

/// Returns true iff every requested sku is present in `map` and in stock.
///
/// Absent skus count as unavailable. The result depends only on the set of
/// requested skus, not on their order or repetition.
pub fn all_available(map: &AvailabilityMap, requested: &[SkuCode]) -> bool {
    requested
        .iter()
        .all(|sku| map.get(sku.as_str()).unwrap_or(false))
}

/// Returns the distinct requested skus that are absent or out of stock, in
/// first-seen request order.
pub fn unavailable_skus(map: &AvailabilityMap, requested: &[SkuCode]) -> Vec<SkuCode> {
    let mut missing: Vec<SkuCode> = Vec::new();
    for sku in requested {
        if !map.get(sku.as_str()).unwrap_or(false) && !missing.contains(sku) {
            missing.push(sku.clone());
        }
    }
    missing
}
