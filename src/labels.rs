// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and gatewaydns-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` on resources created by this controller
pub const PART_OF_GATEWAYDNS: &str = "gatewaydns";

/// Value for `app.kubernetes.io/managed-by` on records created by the `DNSPolicy` controller
pub const MANAGED_BY_DNS_POLICY: &str = "DNSPolicy";

// ============================================================================
// DNSRecord Ownership Labels
// ============================================================================

/// Name of the gateway a `DNSRecord` was generated for
pub const GATEWAY_LABEL: &str = "gatewaydns.io/gateway";

/// Namespace of the gateway a `DNSRecord` was generated for
pub const GATEWAY_NAMESPACE_LABEL: &str = "gatewaydns.io/gateway-namespace";

/// Name of the `DNSPolicy` a `DNSRecord` was generated for
pub const POLICY_LABEL: &str = "gatewaydns.io/dnspolicy";

/// Namespace of the `DNSPolicy` a `DNSRecord` was generated for
pub const POLICY_NAMESPACE_LABEL: &str = "gatewaydns.io/dnspolicy-namespace";

// ============================================================================
// Cluster Labels
// ============================================================================

/// Cluster label selecting the geo code of that cluster's endpoints
pub const CLUSTER_GEO_CODE_LABEL: &str = "gatewaydns.io/geo-code";

// ============================================================================
// Gateway Annotations
// ============================================================================

/// Back-reference from a gateway to the `DNSPolicy` (`namespace/name`) managing its DNS
pub const DNS_POLICY_ANNOTATION: &str = "gatewaydns.io/dns-policy";

/// Comma separated names of the clusters a gateway is placed on
pub const PLACED_CLUSTERS_ANNOTATION: &str = "gatewaydns.io/placed-clusters";

/// JSON map from cluster name to that cluster's gateway status
pub const CLUSTER_STATUS_ANNOTATION: &str = "gatewaydns.io/cluster-status";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `DNSPolicy` resources
pub const FINALIZER_DNS_POLICY: &str = "gatewaydns.io/dnspolicy-finalizer";

/// Finalizer held on a `Gateway` while DNS records are published for it
pub const FINALIZER_GATEWAY_DNS: &str = "gatewaydns.io/dns-records";
