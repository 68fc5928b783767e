//! Prometheus metrics collection for flowpick
//!
//! This module provides metrics instrumentation for tracking:
//! - Selections by backend
//! - Lookups that found no eligible backend
//! - Reconfigurations and the current sequence length
//!
//! The selector itself stays free of side effects; metrics are recorded by
//! [`crate::handle::SelectorHandle`] when one is attached.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for flowpick
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    selections_total: IntCounterVec,
    no_backend_total: IntCounter,
    reconfigurations_total: IntCounter,
    sequence_length: IntGauge,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: one series per configured backend name
        let selections_total = IntCounterVec::new(
            Opts::new(
                "flowpick_selections_total",
                "Total number of flows mapped to each backend",
            ),
            &["backend"],
        )?;

        let no_backend_total = IntCounter::new(
            "flowpick_no_backend_total",
            "Total number of lookups that found no eligible backend",
        )?;

        let reconfigurations_total = IntCounter::new(
            "flowpick_reconfigurations_total",
            "Total number of selector swaps",
        )?;

        let sequence_length = IntGauge::new(
            "flowpick_sequence_length",
            "Length of the current expanded selection sequence (sum of positive weights)",
        )?;

        registry.register(Box::new(selections_total.clone()))?;
        registry.register(Box::new(no_backend_total.clone()))?;
        registry.register(Box::new(reconfigurations_total.clone()))?;
        registry.register(Box::new(sequence_length.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            selections_total,
            no_backend_total,
            reconfigurations_total,
            sequence_length,
        })
    }

    /// Record a flow mapped to `backend`
    pub fn record_selection(&self, backend: &str) -> Result<(), prometheus::Error> {
        self.selections_total
            .get_metric_with_label_values(&[backend])?
            .inc();
        Ok(())
    }

    /// Record a lookup against an empty selector
    pub fn record_no_backend(&self) {
        self.no_backend_total.inc();
    }

    /// Record a selector swap and the new sequence length
    pub fn record_reconfiguration(&self, sequence_length: usize) {
        self.reconfigurations_total.inc();
        self.set_sequence_length(sequence_length);
    }

    pub fn set_sequence_length(&self, sequence_length: usize) {
        self.sequence_length
            .set(i64::try_from(sequence_length).unwrap_or(i64::MAX));
    }

    pub fn selections_count(&self, backend: &str) -> u64 {
        self.selections_total
            .get_metric_with_label_values(&[backend])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    pub fn no_backend_count(&self) -> u64 {
        self.no_backend_total.get()
    }

    pub fn reconfigurations_count(&self) -> u64 {
        self.reconfigurations_total.get()
    }

    pub fn sequence_length(&self) -> i64 {
        self.sequence_length.get()
    }

    /// Gather all metrics and encode them in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(
                invalid_byte_index = e.utf8_error().valid_up_to(),
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_registers_all() {
        let metrics = Metrics::new().expect("should create metrics");
        metrics.record_selection("backend1").unwrap();
        metrics.record_no_backend();
        metrics.record_reconfiguration(6);

        let output = metrics.gather().expect("should gather");
        assert!(output.contains("flowpick_selections_total"));
        assert!(output.contains("flowpick_no_backend_total"));
        assert!(output.contains("flowpick_reconfigurations_total"));
        assert!(output.contains("flowpick_sequence_length 6"));
    }

    #[test]
    fn test_selection_counts_per_backend() {
        let metrics = Metrics::new().unwrap();
        metrics.record_selection("a").unwrap();
        metrics.record_selection("a").unwrap();
        metrics.record_selection("b").unwrap();

        assert_eq!(metrics.selections_count("a"), 2);
        assert_eq!(metrics.selections_count("b"), 1);
        assert_eq!(metrics.selections_count("never"), 0);
    }

    #[test]
    fn test_gather_includes_backend_label() {
        let metrics = Metrics::new().unwrap();
        metrics.record_selection("backend2").unwrap();
        let output = metrics.gather().unwrap();
        assert!(output.contains(r#"flowpick_selections_total{backend="backend2"} 1"#));
    }

    #[test]
    fn test_reconfiguration_updates_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.record_reconfiguration(10);
        metrics.record_reconfiguration(0);
        assert_eq!(metrics.reconfigurations_count(), 2);
        assert_eq!(metrics.sequence_length(), 0);
    }
}
