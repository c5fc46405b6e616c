// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Pipelines-as-Code operator.
//!
//! All metrics share the `pac_operator_tekton_dev` prefix.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - outcome, duration and requeues per resource kind
//! - **Installer Set Metrics** - sets created, updated and deleted per set type
//! - **Orphan Metrics** - additional-controller sets garbage collected
//!
//! # Example
//!
//! ```rust,no_run
//! use pac_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("OpenShiftPipelinesAsCode", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

const METRICS_NAMESPACE: &str = "pac_operator_tekton_dev";

/// Registry every metric in this module is registered with.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Labels: `resource_type`, `status` (success, error, requeue)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Labels: `resource_type`, `reason` (`requeue_after`, `reconcile_again`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Installer Set Metrics
// ============================================================================

/// Labels: `set_type`, `operation` (created, updated, deleted)
pub static INSTALLER_SET_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_installer_set_operations_total"),
        "Total number of TektonInstallerSet mutations by set type and operation",
    );
    let counter = CounterVec::new(opts, &["set_type", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

pub static ORPHAN_CLEANUPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_orphan_cleanups_total"),
        "Total number of additional-controller installer sets removed by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

pub fn record_installer_set_created(set_type: &str) {
    INSTALLER_SET_OPERATIONS_TOTAL
        .with_label_values(&[set_type, "created"])
        .inc();
}

pub fn record_installer_set_updated(set_type: &str) {
    INSTALLER_SET_OPERATIONS_TOTAL
        .with_label_values(&[set_type, "updated"])
        .inc();
}

pub fn record_installer_set_deleted(set_type: &str) {
    INSTALLER_SET_OPERATIONS_TOTAL
        .with_label_values(&[set_type, "deleted"])
        .inc();
}

pub fn record_orphan_cleanup(success: bool) {
    let status = if success { "success" } else { "error" };
    ORPHAN_CLEANUPS_TOTAL.with_label_values(&[status]).inc();
}

/// Encode every registered metric in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResourceSuccess";

        record_reconciliation_success(resource_type, Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_requeue() {
        let resource_type = "TestResourceRequeue";

        record_reconciliation_requeue(resource_type, "requeue_after");

        assert!(
            REQUEUE_TOTAL
                .with_label_values(&[resource_type, "requeue_after"])
                .get()
                > 0.0
        );
        assert!(
            RECONCILIATION_TOTAL
                .with_label_values(&[resource_type, "requeue"])
                .get()
                > 0.0
        );
    }

    #[test]
    fn test_installer_set_operations() {
        record_installer_set_created("custom-test-metrics");
        record_installer_set_deleted("custom-test-metrics");

        let created =
            INSTALLER_SET_OPERATIONS_TOTAL.with_label_values(&["custom-test-metrics", "created"]);
        let deleted =
            INSTALLER_SET_OPERATIONS_TOTAL.with_label_values(&["custom-test-metrics", "deleted"]);
        assert!((created.get() - 1.0).abs() < f64::EPSILON);
        assert!((deleted.get() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gather_metrics_contains_prefix() {
        record_orphan_cleanup(true);

        let output = gather_metrics().unwrap();
        assert!(output.contains("pac_operator_tekton_dev_orphan_cleanups_total"));
    }
}
