//! Inventory lookup trait and in-memory implementation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::SkuCode;
use domain::Availability;

use crate::error::LookupError;

/// Asks inventory which skus can be ordered right now.
#[async_trait]
pub trait InventoryLookup: Send + Sync {
    /// Looks up availability for the given skus in a single remote call.
    ///
    /// The answer holds one entry per sku inventory knows about; unknown skus
    /// are left out. An empty slice succeeds with an empty answer and makes
    /// no call.
    async fn check(&self, skus: &[SkuCode]) -> Result<Vec<Availability>, LookupError>;
}

#[async_trait]
impl<T: InventoryLookup + ?Sized> InventoryLookup for Arc<T> {
    async fn check(&self, skus: &[SkuCode]) -> Result<Vec<Availability>, LookupError> {
        (**self).check(skus).await
    }
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<SkuCode, bool>,
    response_delay: Option<Duration>,
    scripted_failures: VecDeque<LookupError>,
    always_fail: Option<LookupError>,
}

/// In-memory inventory lookup for testing.
///
/// Answers from a stock table and can be scripted to be slow or to fail.
/// Clones share state, so a test can keep one handle while the coordinator
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLookup {
    state: Arc<RwLock<InMemoryInventoryState>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryInventoryLookup {
    /// Creates a lookup that knows no skus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lookup pre-filled with `(sku, in_stock)` entries.
    pub fn with_stock<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<SkuCode>,
    {
        let lookup = Self::new();
        for (sku, in_stock) in entries {
            lookup.set_stock(sku, in_stock);
        }
        lookup
    }

    /// Records whether a sku is in stock.
    pub fn set_stock(&self, sku: impl Into<SkuCode>, in_stock: bool) {
        self.write().stock.insert(sku.into(), in_stock);
    }

    /// Makes every call wait this long before answering.
    pub fn set_response_delay(&self, delay: Option<Duration>) {
        self.write().response_delay = delay;
    }

    /// Makes the next `count` calls fail with `error`.
    pub fn fail_next(&self, count: usize, error: LookupError) {
        let mut state = self.write();
        for _ in 0..count {
            state.scripted_failures.push_back(error.clone());
        }
    }

    /// Makes every call fail with `error` until cleared with `None`.
    pub fn set_always_fail(&self, error: Option<LookupError>) {
        self.write().always_fail = error;
    }

    /// Returns how many calls reached the lookup, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryInventoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl InventoryLookup for InMemoryInventoryLookup {
    async fn check(&self, skus: &[SkuCode]) -> Result<Vec<Availability>, LookupError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }

        self.calls.fetch_add(1, Ordering::SeqCst);

        // Decide the answer up front so no lock is held while waiting.
        let (delay, failure) = {
            let mut state = self.write();
            let failure = state
                .scripted_failures
                .pop_front()
                .or_else(|| state.always_fail.clone());
            (state.response_delay, failure)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = failure {
            return Err(error);
        }

        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        Ok(skus
            .iter()
            .filter(|sku| seen.insert(*sku))
            .filter_map(|sku| {
                state
                    .stock
                    .get(sku)
                    .map(|in_stock| Availability::new(sku.clone(), *in_stock))
            })
            .collect())
    }
}
