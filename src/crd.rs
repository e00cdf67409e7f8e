// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for multi-cluster gateway DNS.
//!
//! This module defines the Kubernetes resources the controller reads and writes.
//!
//! # Resource Types
//!
//! ## Policy and providers
//!
//! - [`DNSPolicy`] - Attaches DNS management to a multi-cluster `Gateway`
//! - [`DNSProvider`] - Points at the credential secret of an authoritative DNS provider
//!
//! ## Records
//!
//! - [`DNSRecord`] - The desired endpoint set for one (gateway, policy, subdomain) triple
//!
//! ## Consumed
//!
//! - [`Gateway`] - The subset of the Gateway API `Gateway` resource this controller reads
//!
//! # Example: A weighted DNS policy
//!
//! ```rust,no_run
//! use gatewaydns::crd::{
//!     DNSPolicySpec, LoadBalancingSpec, LoadBalancingWeighted, PolicyTargetReference, ProviderRef,
//! };
//!
//! let spec = DNSPolicySpec {
//!     target_ref: PolicyTargetReference {
//!         group: "gateway.networking.k8s.io".to_string(),
//!         kind: "Gateway".to_string(),
//!         name: "prod-web".to_string(),
//!         namespace: None,
//!     },
//!     provider_ref: ProviderRef {
//!         name: "aws-credentials".to_string(),
//!         namespace: None,
//!     },
//!     load_balancing: Some(LoadBalancingSpec {
//!         weighted: Some(LoadBalancingWeighted {
//!             default_weight: 120,
//!             custom: vec![],
//!         }),
//!         geo: None,
//!     }),
//!     health_check: None,
//!     ttl: None,
//! };
//! ```

use crate::constants::{DEFAULT_TTL_SECS, DEFAULT_WEIGHT};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Label selector to match Kubernetes resources.
///
/// A label selector is a label query over a set of resources. The result of matchLabels and
/// matchExpressions are `ANDed`. An empty label selector matches all objects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent
    /// to an element of matchExpressions, whose key field is "key", the operator is "In",
    /// and the values array contains only "value". All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Operator represents a key's relationship to a set of values.
    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// An array of string values. If the operator is In or `NotIn`,
    /// the values array must be non-empty. If the operator is Exists or `DoesNotExist`,
    /// the values array must be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, Degraded, Failed.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

// ============================================================================
// Endpoints
// ============================================================================

/// DNS record types the controller publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Canonical name (alias) record
    CNAME,
    /// Nameserver delegation record
    NS,
}

impl RecordType {
    /// Wire name of the record type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::CNAME => "CNAME",
            RecordType::NS => "NS",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "CNAME" => Ok(RecordType::CNAME),
            "NS" => Ok(RecordType::NS),
            other => Err(other.to_string()),
        }
    }
}

/// A single DNS answer unit: name, type, targets, TTL and an optional routing variant.
///
/// Several endpoints may share `dnsName` and `recordType` when they carry distinct
/// `setIdentifier`s (weighted, geo or failover variants of the same name).
///
/// # Example
///
/// ```yaml
/// dnsName: api.apps.example.com
/// recordType: A
/// targets: ["192.0.2.10", "192.0.2.11"]
/// recordTTL: 60
/// setIdentifier: eu-west-cluster
/// providerSpecific:
///   weight: "120"
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Fully qualified name the endpoint answers for.
    pub dns_name: String,

    /// Record values, in publication order.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Record type: A, CNAME or NS.
    pub record_type: String,

    /// Distinguishes routing variants sharing `dnsName` and `recordType`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,

    /// TTL in seconds.
    #[serde(rename = "recordTTL", default = "default_record_ttl")]
    #[schemars(range(min = 0, max = 2_147_483_647))]
    pub record_ttl: i64,

    /// Routing metadata keyed by provider-agnostic (`weight`, `geo-code`) or
    /// provider-specific (`aws/failover`, `aws/health-check-id`) property names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_specific: BTreeMap<String, String>,
}

fn default_record_ttl() -> i64 {
    DEFAULT_TTL_SECS
}

impl Endpoint {
    /// Build an endpoint with no set identifier and no provider-specific properties.
    #[must_use]
    pub fn new(dns_name: &str, record_type: RecordType, targets: Vec<String>, ttl: i64) -> Self {
        Self {
            dns_name: dns_name.to_string(),
            targets,
            record_type: record_type.as_str().to_string(),
            set_identifier: String::new(),
            record_ttl: ttl,
            provider_specific: BTreeMap::new(),
        }
    }

    /// Identity of this endpoint within a record's endpoint set.
    ///
    /// Providers use it to tell an idempotent upsert of an existing variant apart from
    /// publishing a new weighted/geo/failover variant.
    #[must_use]
    pub fn set_id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.dns_name, self.record_type, self.set_identifier
        )
    }

    /// Look up a provider-specific property.
    #[must_use]
    pub fn provider_specific_property(&self, key: &str) -> Option<&str> {
        self.provider_specific.get(key).map(String::as_str)
    }

    /// Set (or overwrite) a provider-specific property.
    pub fn set_provider_specific_property(&mut self, key: &str, value: impl Into<String>) {
        self.provider_specific.insert(key.to_string(), value.into());
    }
}

// ============================================================================
// DNSRecord
// ============================================================================

/// `DNSRecord` status: what was last published to the provider.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Endpoints as of the last successful provider update. Entries whose SetID is no
    /// longer in `spec.endpoints` are deleted from the provider on the next update.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// `DNSRecord` holds the complete desired endpoint set for one gateway hostname.
///
/// Records are created by the `DNSPolicy` reconciler, one per (gateway, policy, subdomain),
/// and labelled with the owning gateway and policy so they can be listed and removed
/// when the policy detaches.
///
/// # Example
///
/// ```yaml
/// apiVersion: gatewaydns.io/v1alpha1
/// kind: DNSRecord
/// metadata:
///   name: prod-web-api
///   namespace: multi-cluster-gateways
///   labels:
///     gatewaydns.io/gateway: prod-web
///     gatewaydns.io/dnspolicy: prod-web
/// spec:
///   zoneID: /hostedzone/Z04114632NOABXYWH93QU
///   endpoints:
///     - dnsName: api.apps.example.com
///       recordType: A
///       targets: ["192.0.2.10"]
///       recordTTL: 60
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "gatewaydns.io",
    version = "v1alpha1",
    kind = "DNSRecord",
    namespaced,
    shortname = "dnsrec",
    doc = "DNSRecord is the desired set of DNS endpoints for one gateway hostname inside a provider zone."
)]
#[kube(status = "DNSRecordStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// Provider zone the endpoints are published into.
    #[serde(rename = "zoneID")]
    pub zone_id: String,

    /// Complete replacement for every name/type/set-identifier this record owns.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

// ============================================================================
// DNSPolicy
// ============================================================================

/// Reference to the resource a policy attaches to.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTargetReference {
    /// API group of the target. Only `gateway.networking.k8s.io` is supported.
    pub group: String,

    /// Kind of the target. Only `Gateway` is supported.
    pub kind: String,

    /// Name of the target.
    pub name: String,

    /// Namespace of the target. Defaults to the policy's namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference to a [`DNSProvider`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRef {
    pub name: String,

    /// Defaults to the policy's namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Load-balancing strategy across the clusters a gateway is placed on.
///
/// When neither strategy is set, every cluster's addresses are merged into a single
/// answer (round robin through multiple A values).
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted: Option<LoadBalancingWeighted>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<LoadBalancingGeo>,
}

/// Weighted routing: one endpoint variant per cluster.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingWeighted {
    /// Weight for clusters no custom weight matches.
    #[serde(default = "default_weight")]
    #[schemars(range(min = 0, max = 255))]
    pub default_weight: i64,

    /// Weights applied to clusters whose labels match the selector. First match wins.
    #[serde(default)]
    pub custom: Vec<CustomWeight>,
}

fn default_weight() -> i64 {
    DEFAULT_WEIGHT
}

/// A weight override for clusters matching a label selector.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomWeight {
    pub selector: LabelSelector,

    #[schemars(range(min = 0, max = 255))]
    pub weight: i64,
}

/// Geo routing: one endpoint variant per geo code.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingGeo {
    /// Geo code for clusters without a `gatewaydns.io/geo-code` label.
    ///
    /// Two letters select a country, `*` the rest of the world, anything else a continent.
    pub default_geo: String,
}

/// Protocol used by provider health checks.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthProtocol {
    #[default]
    Http,
    Https,
}

/// Health check probing each cluster's gateway address.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    /// Request path checked on the gateway (e.g. `/healthz`).
    #[serde(default = "default_health_path")]
    pub endpoint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: Option<i32>,

    #[serde(default)]
    pub protocol: HealthProtocol,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 10))]
    pub failure_threshold: Option<i32>,
}

fn default_health_path() -> String {
    "/".to_string()
}

/// `DNSPolicy` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSPolicyStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// `DNSPolicy` attaches DNS management to a multi-cluster `Gateway`.
///
/// For every listener hostname of the targeted gateway that falls inside a zone of the
/// referenced provider, the controller publishes the ingress addresses of every cluster
/// that currently has routes attached to that listener.
///
/// # Example
///
/// ```yaml
/// apiVersion: gatewaydns.io/v1alpha1
/// kind: DNSPolicy
/// metadata:
///   name: prod-web
///   namespace: multi-cluster-gateways
/// spec:
///   targetRef:
///     group: gateway.networking.k8s.io
///     kind: Gateway
///     name: prod-web
///   providerRef:
///     name: aws-credentials
///   loadBalancing:
///     weighted:
///       defaultWeight: 120
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "gatewaydns.io",
    version = "v1alpha1",
    kind = "DNSPolicy",
    namespaced,
    shortname = "dnspol",
    doc = "DNSPolicy manages DNS records for the listener hostnames of a multi-cluster Gateway."
)]
#[kube(status = "DNSPolicyStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSPolicySpec {
    /// The gateway this policy attaches to.
    pub target_ref: PolicyTargetReference,

    /// Provider whose zones hold the records.
    pub provider_ref: ProviderRef,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing: Option<LoadBalancingSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,

    /// TTL for address (A) endpoints. Defaults to 60 seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 2_147_483_647))]
    pub ttl: Option<i64>,
}

// ============================================================================
// DNSProvider
// ============================================================================

/// Credential secret reference of a [`DNSProvider`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Secret name.
    pub name: String,

    /// Secret namespace. Defaults to the provider's namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Backend discriminator, e.g. `AWS`. Matched case-insensitively.
    pub provider_type: String,
}

/// Provider tuning shared by every backend.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DNSProviderConfig {
    /// Only zones whose id ends with one of these values are considered. Empty means all.
    #[serde(default, rename = "zoneIDFilter")]
    pub zone_id_filter: Vec<String>,
}

/// `DNSProvider` points at the credentials of an authoritative DNS provider.
///
/// # Example
///
/// ```yaml
/// apiVersion: gatewaydns.io/v1alpha1
/// kind: DNSProvider
/// metadata:
///   name: aws-credentials
///   namespace: multi-cluster-gateways
/// spec:
///   credentials:
///     name: aws-route53-secret
///     providerType: AWS
///   config:
///     zoneIDFilter: ["Z04114632NOABXYWH93QU"]
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "gatewaydns.io",
    version = "v1alpha1",
    kind = "DNSProvider",
    namespaced,
    doc = "DNSProvider references the credentials and zone filter of an authoritative DNS provider."
)]
#[serde(rename_all = "camelCase")]
pub struct DNSProviderSpec {
    pub credentials: ProviderCredentials,

    #[serde(default)]
    pub config: DNSProviderConfig,
}

// ============================================================================
// Gateway API (consumed subset)
// ============================================================================

/// A Gateway API listener. Only the fields DNS management needs are modelled.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    pub port: i32,

    pub protocol: String,
}

/// The subset of the Gateway API `Gateway` spec read by this controller.
///
/// The CRD itself is installed by the Gateway API project; `crdgen` never emits it.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1beta1",
    kind = "Gateway",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    pub gateway_class_name: String,

    #[serde(default)]
    pub listeners: Vec<Listener>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
