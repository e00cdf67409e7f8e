// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `DNSPolicy` controller with reflector stores.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - Kubernetes client
//! - Reflector stores for `DNSPolicy` and `Gateway`
//! - The DNS provider cache
//! - Requeue and timeout settings
//!
//! The stores enable in-memory lookups of the gateways a policy affects, so building
//! a gateway diff never lists gateways through the API.

use crate::constants::{
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_REQUEUE_INTERVAL_SECS, ERROR_REQUEUE_DURATION_SECS,
};
use crate::crd::{DNSPolicy, Gateway};
use crate::dns::factory::ProviderCache;
use crate::labels::DNS_POLICY_ANNOTATION;
use crate::selector::{gateway_key, policy_key, policy_targets_gateway};
use kube::runtime::reflector::Store;
use kube::{Client, ResourceExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Reflector stores
    pub stores: Stores,

    /// Providers reused across passes while their configuration is unchanged
    pub providers: Arc<ProviderCache>,

    pub settings: ControllerSettings,
}

/// Requeue and timeout behaviour of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Periodic resync after a successful pass
    pub requeue_interval: Duration,
    /// Requeue delay after a failed pass
    pub error_requeue: Duration,
    /// Upper bound for one reconciliation pass
    pub reconcile_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_INTERVAL_SECS),
            error_requeue: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
        }
    }
}

/// Reflector stores, each populated by a dedicated reflector task.
#[derive(Clone)]
pub struct Stores {
    pub dns_policies: Store<DNSPolicy>,
    pub gateways: Store<Gateway>,
    /// Namespace the stores are limited to, `None` when watching all namespaces
    pub namespace: Option<String>,
}

impl Stores {
    /// Gateways the policy targets or that still carry its back-reference annotation.
    ///
    /// Sorted by `namespace/name` so passes touch gateways in a stable order.
    #[must_use]
    pub fn gateways_for_policy(&self, policy: &DNSPolicy) -> Vec<Gateway> {
        let key = policy_key(policy);
        let mut gateways: Vec<Gateway> = self
            .gateways
            .state()
            .iter()
            .filter(|gw| {
                policy_targets_gateway(policy, gw)
                    || gw.annotations().get(DNS_POLICY_ANNOTATION) == Some(&key)
            })
            .map(|gw| (**gw).clone())
            .collect();
        gateways.sort_by_key(|gw| (gw.namespace(), gw.name_any()));
        gateways
    }

    /// `namespace/name` of every gateway in the store.
    #[must_use]
    pub fn gateway_keys(&self) -> BTreeSet<String> {
        self.gateways
            .state()
            .iter()
            .map(|gw| gateway_key(gw))
            .collect()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
