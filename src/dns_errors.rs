// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS reconciliation error types for gatewaydns.
//!
//! This module provides specialized error types for:
//! - Zone matching of listener hostnames
//! - Validation of endpoints, credentials and provider types
//! - Failures reported by an authoritative DNS provider
//! - Placement (cluster attachment) queries
//!
//! Kubernetes API failures are carried untouched in [`DnsError::Kube`] so callers can
//! tell a missing object from a transient lookup failure by type rather than by message.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static REQUEST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"request id: [^\s]+").unwrap());

/// Errors raised while matching a hostname against provider zones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// No zone name is a dot-bounded suffix of the host.
    ///
    /// The listener is skipped: DNS is only managed for hostnames inside a known zone.
    #[error("no matching zone found for host '{host}'")]
    NoMatchingZone {
        /// The hostname that matched no zone
        host: String,
    },
}

/// Validation failures. Fatal for the unit they affect and never retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Only A, CNAME and NS endpoints can be published.
    #[error("unsupported record type '{record_type}' for '{dns_name}'")]
    UnsupportedRecordType {
        /// The endpoint name
        dns_name: String,
        /// The rejected record type
        record_type: String,
    },

    /// An endpoint had an empty `dnsName`.
    #[error("endpoint has no domain name")]
    MissingDomain,

    /// An endpoint had no targets.
    #[error("endpoint '{dns_name}' has no targets")]
    MissingTargets {
        /// The endpoint name
        dns_name: String,
    },

    /// The credential type names no known provider backend.
    #[error("unsupported provider type '{provider_type}'")]
    UnsupportedProviderType {
        /// The type string as declared on the credentials
        provider_type: String,
    },

    /// The credential secret lacked the key id or the secret key.
    #[error("credentials in secret '{secret}' are empty")]
    EmptyCredentials {
        /// `namespace/name` of the secret
        secret: String,
    },
}

/// Composite error type for DNS reconciliation.
///
/// This is the primary error type returned by the zone, provider and placement layers.
#[derive(Error, Debug)]
pub enum DnsError {
    /// Zone matching error
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// Endpoint, credential or provider type validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure reported by the DNS provider. The message is already sanitized.
    #[error("provider {operation} failed: {message}")]
    Provider {
        /// The provider operation (e.g. `ChangeResourceRecordSets`)
        operation: String,
        /// Sanitized upstream message
        message: String,
    },

    /// Placement query failure for one cluster
    #[error("placement query for gateway '{gateway}' on cluster '{cluster}' failed: {reason}")]
    Placement {
        /// `namespace/name` of the gateway
        gateway: String,
        /// The cluster queried
        cluster: String,
        /// Why the query failed
        reason: String,
    },

    /// Kubernetes API error, kept intact for NotFound / AlreadyExists classification
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl DnsError {
    /// Build a provider error, stripping request identifiers from the upstream message.
    pub fn provider(operation: &str, message: impl AsRef<str>) -> Self {
        Self::Provider {
            operation: operation.to_string(),
            message: sanitize_error(message.as_ref()),
        }
    }

    /// Returns true if the underlying Kubernetes API call answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Kube(e) if is_kube_not_found(e))
    }

    /// Returns true if the underlying Kubernetes API call answered 409 `AlreadyExists`.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Kube(e) if is_kube_already_exists(e))
    }

    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Validation and zone matching errors are permanent until the user changes
    /// configuration; provider and placement failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider { .. } | Self::Placement { .. } => true,
            Self::Kube(e) => !is_kube_not_found(e) && !is_kube_already_exists(e),
            Self::Zone(_) | Self::Validation(_) => false,
        }
    }

    /// Returns the Kubernetes status reason code for this error.
    ///
    /// This is used when updating CRD status conditions to provide
    /// structured error information.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Zone(ZoneError::NoMatchingZone { .. }) => "NoMatchingZone",
            Self::Validation(ValidationError::UnsupportedRecordType { .. }) => {
                "UnsupportedRecordType"
            }
            Self::Validation(ValidationError::MissingDomain) => "MissingDomain",
            Self::Validation(ValidationError::MissingTargets { .. }) => "MissingTargets",
            Self::Validation(ValidationError::UnsupportedProviderType { .. }) => {
                "UnsupportedProviderType"
            }
            Self::Validation(ValidationError::EmptyCredentials { .. }) => "EmptyCredentials",
            Self::Provider { .. } => "ProviderError",
            Self::Placement { .. } => "PlacementError",
            Self::Kube(e) if is_kube_not_found(e) => "NotFound",
            Self::Kube(_) => "KubernetesApiError",
        }
    }
}

/// Returns true for a Kubernetes 404 response.
#[must_use]
pub fn is_kube_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 404)
}

/// Returns true for a Kubernetes 409 response with reason `AlreadyExists`.
#[must_use]
pub fn is_kube_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409 && api_err.reason == "AlreadyExists")
}

/// Strip provider request identifiers from an error message.
///
/// Two failures differing only by the `request id: <token>` fragment normalize to the
/// same string, so retry bookkeeping and alerting treat them as one failure.
#[must_use]
pub fn sanitize_error(message: &str) -> String {
    let stripped = REQUEST_ID.replace_all(message, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
