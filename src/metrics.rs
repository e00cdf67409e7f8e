// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the gatewaydns controller.
//!
//! All metrics carry the namespace prefix `gatewaydns_io_` (prometheus-safe version of
//! "gatewaydns.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconcile outcomes, durations and requeues
//! - **Record Lifecycle Metrics** - `DNSRecord` objects created, updated and deleted
//! - **Provider Metrics** - Record changes and health check operations sent to a DNS provider
//! - **Placement Metrics** - Clusters skipped while building targets
//! - **Error Metrics** - Errors by category
//!
//! # Example
//!
//! ```rust,no_run
//! use gatewaydns::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("DNSPolicy", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "gatewaydns_io";

/// Global Prometheus metrics registry, exposed on `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `DNSPolicy`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
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

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`error`, `timeout`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Record Lifecycle Metrics
// ============================================================================

pub static RECORDS_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "dnsrecords_created_total",
        "Total number of DNSRecord objects created",
        &["namespace"],
    )
});

pub static RECORDS_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "dnsrecords_updated_total",
        "Total number of DNSRecord endpoint updates",
        &["namespace"],
    )
});

pub static RECORDS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "dnsrecords_deleted_total",
        "Total number of DNSRecord objects deleted",
        &["namespace"],
    )
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Record changes submitted to a provider
///
/// Labels:
/// - `action`: `UPSERT` or `DELETE`
pub static PROVIDER_CHANGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "provider_changes_total",
        "Total number of record set changes submitted to DNS providers",
        &["action"],
    )
});

/// Health check operations sent to a provider
///
/// Labels:
/// - `operation`: `create` or `delete`
pub static HEALTH_CHECK_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "health_check_operations_total",
        "Total number of provider health check operations",
        &["operation"],
    )
});

// ============================================================================
// Placement Metrics
// ============================================================================

/// Clusters left out of a gateway's targets
///
/// Labels:
/// - `reason`: `no_routes` or `query_failed`
pub static CLUSTERS_SKIPPED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "clusters_skipped_total",
        "Total number of placed clusters skipped while building DNS targets",
        &["reason"],
    )
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Category of error (`provider_error`, `validation_error`, `api_error`, `timeout`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "errors_total",
        "Total number of errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

pub fn record_dns_record_created(namespace: &str) {
    RECORDS_CREATED_TOTAL.with_label_values(&[namespace]).inc();
}

pub fn record_dns_record_updated(namespace: &str) {
    RECORDS_UPDATED_TOTAL.with_label_values(&[namespace]).inc();
}

pub fn record_dns_record_deleted(namespace: &str) {
    RECORDS_DELETED_TOTAL.with_label_values(&[namespace]).inc();
}

/// Record one record set change submitted to a provider
///
/// # Arguments
/// * `action` - `UPSERT` or `DELETE`
pub fn record_provider_change(action: &str) {
    PROVIDER_CHANGES_TOTAL.with_label_values(&[action]).inc();
}

/// Record a provider health check operation
pub fn record_health_check_operation(operation: &str) {
    HEALTH_CHECK_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Record a placed cluster that contributed no target
pub fn record_cluster_skipped(reason: &str) {
    CLUSTERS_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where error occurred
/// * `error_type` - Category of error (e.g., `provider_error`, `validation_error`)
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
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
        let resource_type = "TestResource";

        record_reconciliation_success(resource_type, Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);
        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_requeue() {
        record_reconciliation_requeue("RequeueTest", "timeout");

        let counter = REQUEUE_TOTAL.with_label_values(&["RequeueTest", "timeout"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_provider_activity() {
        record_provider_change("UPSERT");
        record_health_check_operation("create");
        record_cluster_skipped("no_routes");

        assert!(PROVIDER_CHANGES_TOTAL.with_label_values(&["UPSERT"]).get() > 0.0);
        assert!(
            HEALTH_CHECK_OPERATIONS_TOTAL
                .with_label_values(&["create"])
                .get()
                > 0.0
        );
        assert!(CLUSTERS_SKIPPED_TOTAL.with_label_values(&["no_routes"]).get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("gatewaydns_io"));
        assert!(metrics_text.contains("reconciliations_total"));
    }
}
