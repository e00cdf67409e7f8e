// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label selector matching and `Gateway` → `DNSPolicy` watch mapping.
//!
//! [`LabelSelector::matches`] evaluates custom weight selectors against cluster labels.
//! [`find_policies_for_gateway`] lets the `DNSPolicy` controller re-reconcile every policy
//! that targets, or used to target, a gateway whenever that gateway changes.
//!
//! # Architecture
//!
//! The watch pattern uses kube-rs's reflector/store to maintain an in-memory cache of all
//! `DNSPolicy` resources. When a gateway changes (placement, listener or annotation
//! updates), the watch mapper synchronously queries this cache.
//!
//! # Example
//!
//! ```rust,no_run
//! use gatewaydns::selector::find_policies_for_gateway;
//! use gatewaydns::crd::{DNSPolicy, Gateway};
//! use kube::runtime::reflector::Store;
//!
//! # async fn example(store: Store<DNSPolicy>, gateway: Gateway) {
//! let policies = find_policies_for_gateway(&store, &gateway);
//! # }
//! ```

use crate::crd::{DNSPolicy, Gateway, LabelSelector, LabelSelectorRequirement};
use crate::labels::DNS_POLICY_ANNOTATION;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;
use std::collections::BTreeMap;

impl LabelSelector {
    /// Returns true if `labels` satisfy every `matchLabels` entry and every
    /// `matchExpressions` requirement. An empty selector matches everything.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let labels_match = self
            .match_labels
            .as_ref()
            .is_none_or(|wanted| wanted.iter().all(|(k, v)| labels.get(k) == Some(v)));

        let expressions_match = self
            .match_expressions
            .as_ref()
            .is_none_or(|reqs| reqs.iter().all(|req| req.matches(labels)));

        labels_match && expressions_match
    }
}

impl LabelSelectorRequirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let values = self.values.as_deref().unwrap_or_default();
        match self.operator.as_str() {
            "In" => labels.get(&self.key).is_some_and(|v| values.contains(v)),
            "NotIn" => labels.get(&self.key).is_none_or(|v| !values.contains(v)),
            "Exists" => labels.contains_key(&self.key),
            "DoesNotExist" => !labels.contains_key(&self.key),
            // Unknown operators never match
            _ => false,
        }
    }
}

/// `namespace/name` key used by the gateway back-reference annotation.
#[must_use]
pub fn policy_key(policy: &DNSPolicy) -> String {
    format!(
        "{}/{}",
        policy.namespace().unwrap_or_default(),
        policy.name_any()
    )
}

#[must_use]
pub fn gateway_key(gateway: &Gateway) -> String {
    format!(
        "{}/{}",
        gateway.namespace().unwrap_or_default(),
        gateway.name_any()
    )
}

/// Returns true if `policy.spec.targetRef` names `gateway`.
#[must_use]
pub fn policy_targets_gateway(policy: &DNSPolicy, gateway: &Gateway) -> bool {
    let target = &policy.spec.target_ref;
    let target_namespace = target
        .namespace
        .clone()
        .or_else(|| policy.namespace())
        .unwrap_or_default();

    target.group == crate::constants::GATEWAY_API_GROUP
        && target.kind == crate::constants::KIND_GATEWAY
        && target.name == gateway.name_any()
        && target_namespace == gateway.namespace().unwrap_or_default()
}

/// Find all `DNSPolicy` resources in the store that target `gateway` or that the gateway's
/// back-reference annotation still names.
///
/// Policies named only by the annotation must be reconciled too so their records are
/// removed once the policy stops targeting the gateway.
pub fn find_policies_for_gateway(
    store: &Store<DNSPolicy>,
    gateway: &Gateway,
) -> Vec<ObjectRef<DNSPolicy>> {
    let annotated = gateway.annotations().get(DNS_POLICY_ANNOTATION).cloned();

    store
        .state()
        .iter()
        .filter(|policy| {
            policy_targets_gateway(policy, gateway)
                || annotated.as_deref() == Some(policy_key(policy).as_str())
        })
        .map(|policy| ObjectRef::from_obj(&**policy))
        .collect()
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
