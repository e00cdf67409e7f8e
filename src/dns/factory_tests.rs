// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for provider dispatch.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{DNSProviderConfig, ProviderCredentials};
    use crate::dns::fake::{new_event_log, FakeProvider};
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn spec(provider_type: &str) -> DNSProviderSpec {
        DNSProviderSpec {
            credentials: ProviderCredentials {
                name: "aws-route53-secret".to_string(),
                namespace: None,
                provider_type: provider_type.to_string(),
            },
            config: DNSProviderConfig::default(),
        }
    }

    fn secret(entries: &[(&str, &str)]) -> Secret {
        let mut secret = Secret::default();
        secret.metadata.name = Some("aws-route53-secret".to_string());
        secret.metadata.namespace = Some("gateways".to_string());
        secret.data = Some(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect::<BTreeMap<_, _>>(),
        );
        secret
    }

    #[test]
    fn test_provider_type_parse_is_case_insensitive() {
        assert_eq!("AWS".parse::<ProviderType>().unwrap(), ProviderType::Aws);
        assert_eq!("aws".parse::<ProviderType>().unwrap(), ProviderType::Aws);
        assert_eq!("Google".parse::<ProviderType>().unwrap(), ProviderType::Gcp);
        assert_eq!("azure".parse::<ProviderType>().unwrap(), ProviderType::Azure);
    }

    #[test]
    fn test_provider_type_unknown_keeps_offending_string() {
        let err = "powerdns".parse::<ProviderType>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedProviderType {
                provider_type: "powerdns".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_unsupported() {
        let result = provider_from_secret(&spec("cloudflare"), &secret(&[])).await;

        match result {
            Err(DnsError::Validation(ValidationError::UnsupportedProviderType {
                provider_type,
            })) => assert_eq!(provider_type, "cloudflare"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_recognised_type_without_backend_is_unsupported() {
        for provider_type in ["GCP", "AZURE"] {
            let result = provider_from_secret(&spec(provider_type), &secret(&[])).await;
            assert!(matches!(
                result,
                Err(DnsError::Validation(
                    ValidationError::UnsupportedProviderType { .. }
                ))
            ));
        }
    }

    #[tokio::test]
    async fn test_aws_with_empty_credentials() {
        let result = provider_from_secret(
            &spec("AWS"),
            &secret(&[("AWS_ACCESS_KEY_ID", "AKIA"), ("AWS_SECRET_ACCESS_KEY", "")]),
        )
        .await;

        match result {
            Err(DnsError::Validation(ValidationError::EmptyCredentials { secret })) => {
                assert_eq!(secret, "gateways/aws-route53-secret");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    fn dns_provider(uid: &str, generation: i64) -> DNSProvider {
        let mut provider = DNSProvider::new("aws-credentials", spec("AWS"));
        provider.metadata.namespace = Some("gateways".to_string());
        provider.metadata.uid = Some(uid.to_string());
        provider.metadata.generation = Some(generation);
        provider
    }

    #[test]
    fn test_fingerprint_follows_provider_and_secret_changes() {
        let mut s = secret(&[]);
        s.metadata.resource_version = Some("41".to_string());
        let base = provider_fingerprint(&dns_provider("uid-1", 1), &s);

        assert_eq!(base, provider_fingerprint(&dns_provider("uid-1", 1), &s));
        assert_ne!(base, provider_fingerprint(&dns_provider("uid-1", 2), &s));
        assert_ne!(base, provider_fingerprint(&dns_provider("uid-2", 1), &s));

        s.metadata.resource_version = Some("42".to_string());
        assert_ne!(base, provider_fingerprint(&dns_provider("uid-1", 1), &s));
    }

    #[test]
    fn test_cache_returns_provider_for_matching_fingerprint_only() {
        let cache = ProviderCache::new();
        let provider: Arc<dyn Provider> = Arc::new(FakeProvider::new(vec![], new_event_log()));
        cache.insert(
            "gateways/aws-credentials".to_string(),
            "uid-1/1/41".to_string(),
            provider.clone(),
        );

        let hit = cache.get("gateways/aws-credentials", "uid-1/1/41").unwrap();
        assert!(Arc::ptr_eq(&hit, &provider));
        assert!(cache.get("gateways/aws-credentials", "uid-1/2/41").is_none());
        assert!(cache.get("gateways/other", "uid-1/1/41").is_none());
    }

    #[test]
    fn test_cache_replaces_stale_entry() {
        let cache = ProviderCache::new();
        let old: Arc<dyn Provider> = Arc::new(FakeProvider::new(vec![], new_event_log()));
        let new: Arc<dyn Provider> = Arc::new(FakeProvider::new(vec![], new_event_log()));
        cache.insert("gateways/aws".to_string(), "a".to_string(), old);
        cache.insert("gateways/aws".to_string(), "b".to_string(), new.clone());

        assert!(cache.get("gateways/aws", "a").is_none());
        assert!(Arc::ptr_eq(&cache.get("gateways/aws", "b").unwrap(), &new));
    }
}
