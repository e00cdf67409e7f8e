// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for DNS error types.

#[cfg(test)]
mod tests {
    use crate::dns_errors::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure(&format!("{reason} for test"), reason)
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_no_matching_zone_error() {
        let error = ZoneError::NoMatchingZone {
            host: "baz.other.com".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "no matching zone found for host 'baz.other.com'"
        );
    }

    #[test]
    fn test_validation_errors_are_not_transient() {
        let errors: Vec<DnsError> = vec![
            ValidationError::MissingDomain.into(),
            ValidationError::MissingTargets {
                dns_name: "api.example.com".into(),
            }
            .into(),
            ValidationError::UnsupportedRecordType {
                dns_name: "api.example.com".into(),
                record_type: "TXT".into(),
            }
            .into(),
            ValidationError::UnsupportedProviderType {
                provider_type: "ftp".into(),
            }
            .into(),
            ValidationError::EmptyCredentials {
                secret: "ns/creds".into(),
            }
            .into(),
        ];

        for error in errors {
            assert!(!error.is_transient(), "{error} should not be transient");
        }
    }

    #[test]
    fn test_unsupported_provider_type_message_carries_type() {
        let error: DnsError = ValidationError::UnsupportedProviderType {
            provider_type: "ftp".into(),
        }
        .into();

        assert!(error.to_string().contains("'ftp'"));
        assert_eq!(error.status_reason(), "UnsupportedProviderType");
    }

    #[test]
    fn test_provider_error_is_transient_and_sanitized() {
        let error = DnsError::provider(
            "ChangeResourceRecordSets",
            "Throttling: Rate exceeded, status code: 400, request id: 4f1c2a9e-77",
        );

        assert!(error.is_transient());
        assert_eq!(error.status_reason(), "ProviderError");
        assert!(!error.to_string().contains("4f1c2a9e"));
    }

    #[test]
    fn test_kube_not_found_classification() {
        let error = DnsError::from(api_error(404, "NotFound"));

        assert!(error.is_not_found());
        assert!(!error.is_already_exists());
        assert!(!error.is_transient());
        assert_eq!(error.status_reason(), "NotFound");
    }

    #[test]
    fn test_kube_already_exists_classification() {
        let error = DnsError::from(api_error(409, "AlreadyExists"));

        assert!(error.is_already_exists());
        assert!(!error.is_not_found());
        assert!(!error.is_transient());
    }

    #[test]
    fn test_kube_conflict_is_not_already_exists() {
        let error = DnsError::from(api_error(409, "Conflict"));

        assert!(!error.is_already_exists());
        assert!(error.is_transient());
        assert_eq!(error.status_reason(), "KubernetesApiError");
    }

    #[test]
    fn test_sanitize_error_equalizes_request_ids() {
        let first = "InvalidChangeBatch: Tried to delete resource record set, request id: 1111-aaaa";
        let second = "InvalidChangeBatch: Tried to delete resource record set, request id: 2222-bbbb";

        assert_ne!(first, second);
        assert_eq!(sanitize_error(first), sanitize_error(second));
        assert_eq!(
            sanitize_error(first),
            "InvalidChangeBatch: Tried to delete resource record set,"
        );
    }

    #[test]
    fn test_sanitize_error_strips_request_id_mid_message() {
        let msg = "operation error Route 53: ListHostedZones, https response error StatusCode: 403, request id: abc-123, api error AccessDenied";

        assert_eq!(
            sanitize_error(msg),
            "operation error Route 53: ListHostedZones, https response error StatusCode: 403, api error AccessDenied"
        );
    }

    #[test]
    fn test_sanitize_error_without_request_id_is_unchanged() {
        assert_eq!(sanitize_error("zone not found"), "zone not found");
    }
}
