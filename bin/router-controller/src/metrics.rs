//! Prometheus metrics for the reconciler

use anyhow::Result;
use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct ControllerMetrics {
    /// Reconciliations by outcome
    pub reconciliations_total: CounterVec,
    /// Objects server-side applied, by kind
    pub objects_applied_total: CounterVec,
    /// Gated-out objects deleted, by kind
    pub objects_deleted_total: CounterVec,
    pub reconcile_duration_seconds: Histogram,
    pub registry: Arc<Registry>,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let reconciliations_total = CounterVec::new(
            Opts::new(
                "gerrit_router_reconciliations_total",
                "GerritNetwork reconciliations by result",
            ),
            &["result"],
        )?;

        let objects_applied_total = CounterVec::new(
            Opts::new(
                "gerrit_router_objects_applied_total",
                "Routing objects applied",
            ),
            &["kind"],
        )?;

        let objects_deleted_total = CounterVec::new(
            Opts::new(
                "gerrit_router_objects_deleted_total",
                "Routing objects deleted",
            ),
            &["kind"],
        )?;

        let reconcile_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "gerrit_router_reconcile_duration_seconds",
            "Reconciliation latency in seconds",
        ))?;

        registry.register(Box::new(reconciliations_total.clone()))?;
        registry.register(Box::new(objects_applied_total.clone()))?;
        registry.register(Box::new(objects_deleted_total.clone()))?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;

        Ok(Self {
            reconciliations_total,
            objects_applied_total,
            objects_deleted_total,
            reconcile_duration_seconds,
            registry,
        })
    }

    pub fn record_reconcile(&self, result: &str) {
        self.reconciliations_total.with_label_values(&[result]).inc();
    }

    pub fn record_applied(&self, kind: &str) {
        self.objects_applied_total.with_label_values(&[kind]).inc();
    }

    pub fn record_deleted(&self, kind: &str) {
        self.objects_deleted_total.with_label_values(&[kind]).inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ControllerMetrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_metrics_gather() {
        let metrics = ControllerMetrics::new().unwrap();
        metrics.record_reconcile("success");
        metrics.record_applied("Mapping");
        metrics.record_applied("Mapping");
        metrics.record_deleted("Host");
        metrics.reconcile_duration_seconds.observe(0.25);

        let output = metrics.gather().unwrap();
        assert!(output.contains("gerrit_router_reconciliations_total{result=\"success\"} 1"));
        assert!(output.contains("gerrit_router_objects_applied_total{kind=\"Mapping\"} 2"));
        assert!(output.contains("gerrit_router_objects_deleted_total{kind=\"Host\"} 1"));
        assert!(output.contains("gerrit_router_reconcile_duration_seconds_count 1"));
    }

    #[test]
    fn test_metrics_clone_shares_registry() {
        let metrics = ControllerMetrics::new().unwrap();
        let cloned = metrics.clone();
        cloned.record_reconcile("error");
        assert!(metrics
            .gather()
            .unwrap()
            .contains("gerrit_router_reconciliations_total{result=\"error\"} 1"));
    }
}
