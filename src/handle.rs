//! Atomically swappable reference to the current selector
//!
//! Lookups load the current [`WeightedSelector`] without taking a lock.
//! Reconfiguration builds a fresh selector and swaps the pointer; a live
//! sequence is never edited in place. Readers that took a snapshot before
//! the swap keep using the old selector until they drop it.

use crate::backend::Backend;
use crate::flow::{FlowHasher, FlowKey};
use crate::metrics::Metrics;
use crate::selector::WeightedSelector;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared entry point for selection that supports lock-free reconfiguration
pub struct SelectorHandle {
    current: ArcSwap<WeightedSelector>,
    metrics: Option<Arc<Metrics>>,
}

impl SelectorHandle {
    /// Create a handle serving the given selector
    pub fn new(selector: WeightedSelector) -> Self {
        Self {
            current: ArcSwap::from_pointee(selector),
            metrics: None,
        }
    }

    /// Create a handle from an ordered backend list
    pub fn from_backends(backends: &[Arc<Backend>]) -> Self {
        Self::new(WeightedSelector::new(backends))
    }

    /// Attach metrics; selections and swaps are recorded from now on
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics.set_sequence_length(self.current.load().len());
        self.metrics = Some(metrics);
        self
    }

    /// Snapshot of the current selector
    ///
    /// Use this to answer a batch of lookups against one consistent
    /// configuration.
    pub fn current(&self) -> Arc<WeightedSelector> {
        self.current.load_full()
    }

    /// Select the backend for a flow hash using the current selector
    pub fn select(&self, hash: u64) -> Option<Arc<Backend>> {
        let selected = self.current.load().select(hash).cloned();
        self.record(selected.as_deref());
        selected
    }

    /// Select the backend for a signed hash (see [`WeightedSelector::select_signed`])
    pub fn select_signed(&self, hash: i64) -> Option<Arc<Backend>> {
        let selected = self.current.load().select_signed(hash).cloned();
        self.record(selected.as_deref());
        selected
    }

    /// Hash a flow and select its backend
    pub fn select_flow(&self, hasher: &dyn FlowHasher, flow: &FlowKey) -> Option<Arc<Backend>> {
        let hash = hasher.hash_flow(flow);
        let selected = self.select(hash);

        tracing::trace!(
            flow = %flow,
            hash,
            backend = selected.as_deref().map(Backend::name),
            "Resolved flow"
        );

        selected
    }

    /// Replace the current selector with one built from `backends`
    pub fn reconfigure(&self, backends: &[Arc<Backend>]) {
        self.store(WeightedSelector::new(backends));
    }

    /// Publish a new selector
    pub fn store(&self, selector: WeightedSelector) {
        let new_length = selector.len();
        let previous = self.current.swap(Arc::new(selector));

        tracing::info!(
            previous_sequence_length = previous.len(),
            sequence_length = new_length,
            "Swapped selector"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_reconfiguration(new_length);
        }
    }

    fn record(&self, selected: Option<&Backend>) {
        let Some(metrics) = &self.metrics else {
            return;
        };

        match selected {
            Some(backend) => {
                if let Err(e) = metrics.record_selection(backend.name()) {
                    tracing::warn!(
                        backend = %backend.name(),
                        error = %e,
                        "Failed to record selection metric"
                    );
                }
            }
            None => metrics.record_no_backend(),
        }
    }
}

impl std::fmt::Debug for SelectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorHandle")
            .field("sequence_length", &self.current.load().len())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
