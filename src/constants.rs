// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the gatewaydns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all gatewaydns CRDs
pub const API_GROUP: &str = "gatewaydns.io";

/// API version for all gatewaydns CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "gatewaydns.io/v1alpha1";

/// Kind name for `DNSPolicy` resource
pub const KIND_DNS_POLICY: &str = "DNSPolicy";

/// Kind name for `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

/// Kind name for `DNSProvider` resource
pub const KIND_DNS_PROVIDER: &str = "DNSProvider";

/// API group of the Gateway API
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// Kind name of the Gateway API `Gateway`
pub const KIND_GATEWAY: &str = "Gateway";

// ============================================================================
// DNS Constants
// ============================================================================

/// Default TTL for address (A) endpoints
pub const DEFAULT_TTL_SECS: i64 = 60;

/// TTL for CNAME endpoints
pub const DEFAULT_CNAME_TTL_SECS: i64 = 300;

/// Weight given to a cluster when no weighted strategy assigns one
pub const DEFAULT_WEIGHT: i64 = 120;

/// Provider-agnostic endpoint property carrying a routing weight
pub const PROVIDER_SPECIFIC_WEIGHT: &str = "weight";

/// Provider-agnostic endpoint property carrying a geo code
pub const PROVIDER_SPECIFIC_GEO_CODE: &str = "geo-code";

/// Geo code matching every location no other variant covers
pub const WILDCARD_GEO: &str = "*";

/// Replacement for the `*` label when deriving object names from wildcard hosts
pub const WILDCARD_NAME: &str = "wildcard";

// ============================================================================
// Route53 Constants
// ============================================================================

/// Secret key holding the AWS access key id
pub const AWS_ACCESS_KEY_ID_KEY: &str = "AWS_ACCESS_KEY_ID";

/// Secret key holding the AWS secret access key
pub const AWS_SECRET_ACCESS_KEY_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Secret key holding the AWS region
pub const AWS_REGION_KEY: &str = "REGION";

/// Region used when the secret does not name one
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Attempts the Route53 client makes per API call
pub const ROUTE53_MAX_ATTEMPTS: u32 = 3;

/// Route53 health check request interval
pub const ROUTE53_HEALTH_CHECK_INTERVAL_SECS: i32 = 30;

/// Leading characters of the health check reference kept in a Route53 caller reference,
/// leaving room for a 16 character nonce within the 64 character limit
pub const ROUTE53_CALLER_REFERENCE_PREFIX_LEN: usize = 40;

/// Failure threshold used when the policy does not set one
pub const DEFAULT_HEALTH_CHECK_FAILURE_THRESHOLD: i32 = 3;

// ============================================================================
// Controller Constants
// ============================================================================

/// Requeue interval for healthy policies (5 minutes)
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 300;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Upper bound for one policy reconciliation pass
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Page size for Kubernetes list calls
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";
