// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for Kubernetes resources.
//!
//! Conditions follow the standard Kubernetes format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last flipped
//!
//! # Example
//!
//! ```rust,no_run
//! use gatewaydns::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "ReconcileSucceeded",
//!     "DNS records published for 2 gateways"
//! );
//! ```

use crate::crd::{Condition, DNSPolicy, DNSPolicyStatus};
use crate::reconcilers::status_changed;
use chrono::Utc;
use kube::api::Patch;
use kube::{api::PatchParams, Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Create a new Kubernetes condition stamped with the current time.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in place, without any API call.
///
/// `lastTransitionTime` is preserved when the status value does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|new_cond| {
            find_condition(current, &new_cond.r#type).is_some_and(|curr| {
                curr.status == new_cond.status
                    && curr.reason == new_cond.reason
                    && curr.message == new_cond.message
            })
        })
}

/// Collects `DNSPolicy` status changes and applies them in one patch.
///
/// Patching only when something changed keeps status writes from re-triggering the
/// controller in a loop.
pub struct DNSPolicyStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<DNSPolicyStatus>,
    new_status: DNSPolicyStatus,
}

impl DNSPolicyStatusUpdater {
    #[must_use]
    pub fn new(policy: &DNSPolicy) -> Self {
        let current_status = policy.status.clone();
        let new_status = current_status.clone().unwrap_or_default();

        Self {
            namespace: policy.namespace().unwrap_or_default(),
            name: policy.name_any(),
            current_status,
            new_status,
        }
    }

    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                status_changed(
                    &current.observed_generation,
                    &self.new_status.observed_generation,
                ) || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn conditions(&self) -> &Vec<Condition> {
        &self.new_status.conditions
    }

    /// Patch the status subresource if anything changed.
    ///
    /// # Errors
    ///
    /// Returns the Kubernetes API error if the patch fails.
    pub async fn apply(&self, client: &Client) -> Result<(), kube::Error> {
        if !self.has_changes() {
            debug!(
                "DNSPolicy {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(());
        }

        let api: Api<DNSPolicy> = Api::namespaced(client.clone(), &self.namespace);
        let patch = json!({ "status": self.new_status });
        api.patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(
            "Updated DNSPolicy {}/{} status: {} condition(s)",
            self.namespace,
            self.name,
            self.new_status.conditions.len()
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
