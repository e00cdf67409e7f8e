// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for gatewaydns resources.
//!
//! # Reconciliation Architecture
//!
//! gatewaydns follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor `DNSPolicy` changes, and `Gateway` changes mapped back to policies
//! 2. **Reconcile** - Diff the gateways a policy affects and compute their DNS endpoints
//! 3. **Update** - Apply the endpoint sets to the DNS provider through `DNSRecord` objects
//! 4. **Status** - Report reconciliation results back to Kubernetes
//!
//! # Available Reconcilers
//!
//! - [`reconcile_dnspolicy`] - Publishes and removes DNS records for a policy's gateways
//! - [`dnsrecords::RecordReconciler`] - The per-pass record state machine
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use gatewaydns::reconcilers::reconcile_dnspolicy;
//! use gatewaydns::crd::DNSPolicy;
//! use gatewaydns::context::Context;
//! use std::sync::Arc;
//!
//! async fn reconcile_policy(ctx: Arc<Context>, policy: DNSPolicy) -> anyhow::Result<()> {
//!     reconcile_dnspolicy(ctx, policy).await
//! }
//! ```

pub mod dnspolicy;
pub mod dnsrecords;
pub mod finalizers;
pub mod pagination;
pub mod retry;
pub mod status;

pub use dnspolicy::{compute_gateway_diff, reconcile_dnspolicy};
pub use dnsrecords::{GatewayDiff, RecordReconciler};

/// Returns true if `new_value` differs from `current_value`.
///
/// Status writes re-trigger the controller, so callers patch status only when a value
/// actually changed.
///
/// # Example
///
/// ```rust
/// use gatewaydns::reconcilers::status_changed;
///
/// let observed = Some(3);
/// assert!(!status_changed(&observed, &Some(3)));
/// assert!(status_changed(&observed, &Some(4)));
/// ```
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}
