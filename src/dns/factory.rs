// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider factory: turns a `DNSProvider` reference into a live [`Provider`].
//!
//! The credential type string on the `DNSProvider` selects the backend. Lookup failures
//! for the `DNSProvider` or its secret surface as [`DnsError::Kube`] untouched, so a
//! caller can tell a missing object (`is_not_found`) from a misconfigured one
//! ([`ValidationError`]).
//!
//! Built providers are kept in a [`ProviderCache`] until their `DNSProvider` or secret
//! changes, so a provider's health check id cache outlives a single pass.

use crate::crd::{DNSProvider, DNSProviderSpec, ProviderRef};
use crate::dns::route53::Route53Provider;
use crate::dns::Provider;
use crate::dns_errors::{DnsError, ValidationError};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Backends a `DNSProvider` credential can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderType {
    Aws,
    Gcp,
    Azure,
}

impl FromStr for ProviderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AWS" => Ok(Self::Aws),
            "GCP" | "GOOGLE" => Ok(Self::Gcp),
            "AZURE" => Ok(Self::Azure),
            _ => Err(ValidationError::UnsupportedProviderType {
                provider_type: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Aws => "AWS",
            Self::Gcp => "GCP",
            Self::Azure => "AZURE",
        };
        f.write_str(s)
    }
}

/// Providers keyed by `namespace/name` of their `DNSProvider`.
#[derive(Default)]
pub struct ProviderCache {
    providers: Mutex<HashMap<String, (String, Arc<dyn Provider>)>>,
}

impl ProviderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The provider cached for `key`, unless it was built from another `fingerprint`.
    #[must_use]
    pub fn get(&self, key: &str, fingerprint: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .filter(|(cached, _)| cached == fingerprint)
            .map(|(_, provider)| provider.clone())
    }

    pub fn insert(&self, key: String, fingerprint: String, provider: Arc<dyn Provider>) {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, (fingerprint, provider));
    }
}

/// Identity of the inputs a provider was built from. Any edit to the `DNSProvider` or its
/// secret changes it.
#[must_use]
pub fn provider_fingerprint(dns_provider: &DNSProvider, secret: &Secret) -> String {
    format!(
        "{}/{}/{}",
        dns_provider.uid().unwrap_or_default(),
        dns_provider.metadata.generation.unwrap_or_default(),
        secret.resource_version().unwrap_or_default()
    )
}

/// Build the provider for `spec` from an already loaded credential secret.
///
/// # Errors
///
/// - [`ValidationError::UnsupportedProviderType`] for unknown tags and for tags without a backend
/// - Any error of the selected backend's constructor
pub async fn provider_from_secret(
    spec: &DNSProviderSpec,
    secret: &Secret,
) -> Result<Arc<dyn Provider>, DnsError> {
    let provider_type = ProviderType::from_str(&spec.credentials.provider_type)?;
    match provider_type {
        ProviderType::Aws => {
            info!("Creating DNS provider for provider type AWS");
            let provider = Route53Provider::from_secret(secret, &spec.config).await?;
            Ok(Arc::new(provider))
        }
        ProviderType::Gcp | ProviderType::Azure => {
            Err(ValidationError::UnsupportedProviderType {
                provider_type: provider_type.to_string(),
            }
            .into())
        }
    }
}

/// Load the `DNSProvider` named by `provider_ref` and its secret, then build the provider or
/// reuse the one cached for them.
///
/// Namespaces default to `default_namespace` (the policy's) for the `DNSProvider` and to the
/// `DNSProvider`'s own namespace for the secret.
///
/// # Errors
///
/// Kubernetes lookup errors are returned as [`DnsError::Kube`]; see [`provider_from_secret`]
/// for the rest.
pub async fn resolve_provider(
    client: &Client,
    cache: &ProviderCache,
    provider_ref: &ProviderRef,
    default_namespace: &str,
) -> Result<Arc<dyn Provider>, DnsError> {
    let provider_namespace = provider_ref
        .namespace
        .as_deref()
        .unwrap_or(default_namespace);
    let providers: Api<DNSProvider> = Api::namespaced(client.clone(), provider_namespace);
    let dns_provider = providers.get(&provider_ref.name).await?;

    let credentials = &dns_provider.spec.credentials;
    let secret_namespace = credentials
        .namespace
        .as_deref()
        .unwrap_or(provider_namespace);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), secret_namespace);
    let secret = secrets.get(&credentials.name).await?;

    let key = format!("{provider_namespace}/{}", provider_ref.name);
    let fingerprint = provider_fingerprint(&dns_provider, &secret);
    if let Some(provider) = cache.get(&key, &fingerprint) {
        debug!(provider = %key, "Reusing cached DNS provider");
        return Ok(provider);
    }

    info!(
        provider = %key,
        provider_type = %credentials.provider_type,
        "Resolved DNS provider"
    );
    let provider = provider_from_secret(&dns_provider.spec, &secret).await?;
    cache.insert(key, fingerprint, provider.clone());
    Ok(provider)
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod factory_tests;
