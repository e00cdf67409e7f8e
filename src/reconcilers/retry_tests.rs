// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{default_backoff, is_retryable_error, retry_api_call};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure(&format!("{reason} error"), reason)
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_backoff_configuration() {
        let backoff = default_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(100));
        assert_eq!(backoff.max_interval, Duration::from_secs(10));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(60)));
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    #[test]
    fn test_next_backoff_grows_and_caps() {
        let mut backoff = default_backoff();

        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(90) && first <= Duration::from_millis(110));

        let second = backoff.next_backoff().unwrap();
        assert!(second >= Duration::from_millis(180) && second <= Duration::from_millis(220));

        for _ in 0..20 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.current_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_429_and_5xx_are_retryable() {
        assert!(is_retryable_error(&api_error(429, "TooManyRequests")));
        assert!(is_retryable_error(&api_error(500, "InternalError")));
        assert!(is_retryable_error(&api_error(503, "ServiceUnavailable")));
        assert!(is_retryable_error(&api_error(599, "ServerError")));
    }

    #[test]
    fn test_4xx_not_retryable() {
        assert!(!is_retryable_error(&api_error(400, "BadRequest")));
        assert!(!is_retryable_error(&api_error(404, "NotFound")));
        assert!(!is_retryable_error(&api_error(409, "AlreadyExists")));
    }

    #[test]
    fn test_service_errors_retryable() {
        let service_error: Box<dyn std::error::Error + Send + Sync> = Box::new(
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection failed"),
        );
        assert!(is_retryable_error(&kube::Error::Service(service_error)));
    }

    #[tokio::test]
    async fn test_not_found_returned_unchanged_without_retry() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), kube::Error> = retry_api_call(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(404, "NotFound")) }
            },
            "get missing",
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(kube::Error::Api(ref e)) if e.code == 404));
    }

    #[tokio::test]
    async fn test_transient_error_then_success() {
        let calls = AtomicUsize::new(0);

        let result = retry_api_call(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(api_error(503, "ServiceUnavailable"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            "flaky call",
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
