// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - argument parsing and signal handling

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["gatewaydns"]).unwrap();

        assert_eq!(args.metrics_bind_address, "0.0.0.0:8080");
        assert!(args.watch_namespace.is_none());
        assert_eq!(args.settings(), ControllerSettings::default());
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "gatewaydns",
            "--requeue-interval-secs",
            "60",
            "--error-requeue-secs",
            "5",
            "--reconcile-timeout-secs",
            "20",
            "--watch-namespace",
            "gateways",
        ])
        .unwrap();

        let settings = args.settings();
        assert_eq!(settings.requeue_interval, StdDuration::from_secs(60));
        assert_eq!(settings.error_requeue, StdDuration::from_secs(5));
        assert_eq!(settings.reconcile_timeout, StdDuration::from_secs(20));
        assert_eq!(args.watch_namespace.as_deref(), Some("gateways"));
    }

    #[test]
    fn test_args_reject_non_numeric_durations() {
        assert!(Args::try_parse_from(["gatewaydns", "--requeue-interval-secs", "soon"]).is_err());
    }

    /// SIGTERM handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        assert!(signal(SignalKind::terminate()).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_signal_waits_for_a_signal() {
        let result = timeout(StdDuration::from_millis(100), shutdown_signal()).await;

        assert!(result.is_err(), "shutdown_signal should not resolve without a signal");
    }

    #[tokio::test]
    async fn test_metrics_handler_responds_ok() {
        metrics::record_reconciliation_requeue(KIND_DNS_POLICY, "test");

        let response = metrics_handler().await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
