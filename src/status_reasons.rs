// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for gatewaydns resources.
//!
//! Reasons are programmatic identifiers in CamelCase explaining why a condition has
//! a particular status.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   observedGeneration: 4
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: NoMatchingZone
//!       message: "no zone matches host 'api.example.org'"
//! ```
//!
//! Failure reasons for typed DNS errors come from
//! [`DnsError::status_reason`](crate::dns_errors::DnsError::status_reason).

use crate::dns_errors::DnsError;

/// Condition type reported on every `DNSPolicy` and `DNSRecord`.
pub const CONDITION_TYPE_READY: &str = "Ready";

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";

/// Every targeted gateway's DNS records were published.
pub const REASON_RECONCILE_SUCCEEDED: &str = "ReconcileSucceeded";

/// A reconciliation pass failed with an error that is not a typed DNS error.
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

/// A reconciliation pass did not finish before its deadline.
pub const REASON_RECONCILE_TIMEOUT: &str = "ReconcileTimeout";

/// The policy targets a resource kind other than a Gateway API `Gateway`.
pub const REASON_INVALID_TARGET_REF: &str = "InvalidTargetRef";

/// The endpoints in `spec` were applied to the provider.
pub const REASON_RECORD_PUBLISHED: &str = "RecordPublished";

/// Map a reconciliation error onto a condition reason.
///
/// Typed [`DnsError`]s anywhere in the error chain report their own reason; everything
/// else is [`REASON_RECONCILE_FAILED`].
#[must_use]
pub fn reason_for_error(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DnsError>())
        .map_or(REASON_RECONCILE_FAILED, DnsError::status_reason)
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
