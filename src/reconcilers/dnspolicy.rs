// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSPolicy` reconciliation.
//!
//! One pass:
//!
//! 1. Adds the policy finalizer (or, when the policy is being deleted, releases every
//!    annotated gateway and removes the finalizer).
//! 2. Splits the gateways the policy affects into a [`GatewayDiff`] using the policy's
//!    `targetRef` and each gateway's `gatewaydns.io/dns-policy` back-reference.
//! 3. Resolves the policy's provider, removes records of gateways that no longer exist and
//!    runs the record reconciler.
//! 4. Moves the back-reference annotations and the gateway finalizer to match the diff.
//! 5. Reports the outcome on the `Ready` condition.
//!
//! Attached gateways carry the `gatewaydns.io/dns-records` finalizer, so a deleted gateway
//! stays around as an invalid gateway until its records are unpublished.
//!
//! The whole DNS pass is bounded by the configured reconcile timeout.

use crate::constants::{GATEWAY_API_GROUP, KIND_GATEWAY};
use crate::context::Context;
use crate::crd::{DNSPolicy, Gateway};
use crate::dns::factory::resolve_provider;
use crate::labels::{DNS_POLICY_ANNOTATION, FINALIZER_DNS_POLICY, FINALIZER_GATEWAY_DNS};
use crate::metrics;
use crate::placement::AnnotationPlacement;
use crate::reconcilers::dnsrecords::{
    policy_record_labels, GatewayDiff, KubeRecordStore, RecordReconciler, RecordStore,
};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::retry::retry_api_call;
use crate::reconcilers::status::DNSPolicyStatusUpdater;
use crate::selector::{gateway_key, policy_key, policy_targets_gateway};
use crate::status_reasons::{
    reason_for_error, CONDITION_TYPE_READY, REASON_INVALID_TARGET_REF, REASON_RECONCILE_SUCCEEDED,
    REASON_RECONCILE_TIMEOUT, STATUS_FALSE, STATUS_TRUE,
};
use anyhow::{Context as _, Result};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returns true if the policy's `targetRef` names a Gateway API `Gateway`.
#[must_use]
pub fn targets_gateway_kind(policy: &DNSPolicy) -> bool {
    policy.spec.target_ref.group == GATEWAY_API_GROUP && policy.spec.target_ref.kind == KIND_GATEWAY
}

fn is_annotated_for(gateway: &Gateway, key: &str) -> bool {
    gateway
        .annotations()
        .get(DNS_POLICY_ANNOTATION)
        .is_some_and(|value| value == key)
}

/// Split `gateways` by how they reference `policy`.
///
/// - targeted and annotated: valid
/// - targeted, not annotated: missing
/// - annotated, no longer targeted: invalid
/// - targeted or annotated, and being deleted: invalid
///
/// Gateways neither targeted nor annotated are ignored.
#[must_use]
pub fn compute_gateway_diff(policy: &DNSPolicy, gateways: &[Gateway]) -> GatewayDiff {
    let key = policy_key(policy);
    let mut diff = GatewayDiff::default();

    for gateway in gateways {
        let targeted = policy_targets_gateway(policy, gateway);
        let annotated = is_annotated_for(gateway, &key);
        let deleting = gateway.metadata.deletion_timestamp.is_some();
        match (targeted, annotated) {
            (true, _) | (_, true) if deleting => diff.invalid.push(gateway.clone()),
            (true, true) => diff.valid.push(gateway.clone()),
            (true, false) => diff.missing.push(gateway.clone()),
            (false, true) => diff.invalid.push(gateway.clone()),
            (false, false) => {}
        }
    }
    diff
}

/// Diff for a policy being deleted: every annotated gateway is released.
#[must_use]
pub fn deletion_diff(policy: &DNSPolicy, gateways: &[Gateway]) -> GatewayDiff {
    let key = policy_key(policy);
    GatewayDiff {
        invalid: gateways
            .iter()
            .filter(|gw| is_annotated_for(gw, &key))
            .cloned()
            .collect(),
        ..Default::default()
    }
}

/// Reconcile a `DNSPolicy`.
///
/// # Errors
///
/// Returns an error when the finalizer, the DNS pass or the status update fails, or
/// when the pass exceeds the reconcile timeout.
pub async fn reconcile_dnspolicy(ctx: Arc<Context>, policy: DNSPolicy) -> Result<()> {
    let key = policy_key(&policy);
    debug!(policy = %key, generation = ?policy.metadata.generation, "Reconciling DNSPolicy");

    // an unsynced gateway store would make every record look orphaned
    ctx.stores
        .gateways
        .wait_until_ready()
        .await
        .context("gateway store stopped before its first sync")?;

    if policy.metadata.deletion_timestamp.is_some() {
        return delete_dnspolicy(ctx, policy).await;
    }

    ensure_finalizer(&ctx.client, &policy, FINALIZER_DNS_POLICY).await?;

    let mut status = DNSPolicyStatusUpdater::new(&policy);
    status.set_observed_generation(policy.metadata.generation);

    if !targets_gateway_kind(&policy) {
        let target = &policy.spec.target_ref;
        warn!(policy = %key, group = %target.group, kind = %target.kind, "DNSPolicy does not target a Gateway");
        status.set_condition(
            CONDITION_TYPE_READY,
            STATUS_FALSE,
            REASON_INVALID_TARGET_REF,
            &format!(
                "targetRef must be a {GATEWAY_API_GROUP} {KIND_GATEWAY}, got {}/{}",
                target.group, target.kind
            ),
        );
        status.apply(&ctx.client).await?;
        return Ok(());
    }

    let gateways = ctx.stores.gateways_for_policy(&policy);
    let diff = compute_gateway_diff(&policy, &gateways);
    debug!(
        policy = %key,
        valid = diff.valid.len(),
        invalid = diff.invalid.len(),
        missing = diff.missing.len(),
        "Computed gateway diff"
    );

    let outcome =
        tokio::time::timeout(ctx.settings.reconcile_timeout, run_dns_pass(&ctx, &policy, &diff))
            .await;

    let result = match outcome {
        Ok(Ok(())) => {
            status.set_condition(
                CONDITION_TYPE_READY,
                STATUS_TRUE,
                REASON_RECONCILE_SUCCEEDED,
                &format!(
                    "DNS records reconciled for {} gateway(s)",
                    diff.valid.len() + diff.missing.len()
                ),
            );
            Ok(())
        }
        Ok(Err(e)) => {
            status.set_condition(
                CONDITION_TYPE_READY,
                STATUS_FALSE,
                reason_for_error(&e),
                &format!("{e:#}"),
            );
            Err(e)
        }
        Err(_) => {
            let message = format!(
                "reconciliation did not finish within {}s",
                ctx.settings.reconcile_timeout.as_secs()
            );
            status.set_condition(
                CONDITION_TYPE_READY,
                STATUS_FALSE,
                REASON_RECONCILE_TIMEOUT,
                &message,
            );
            Err(anyhow::anyhow!(message))
        }
    };

    status
        .apply(&ctx.client)
        .await
        .with_context(|| format!("failed to update status of DNSPolicy {key}"))?;
    result
}

/// Publish or remove records for every gateway in `diff`, then move the annotations.
async fn run_dns_pass(ctx: &Context, policy: &DNSPolicy, diff: &GatewayDiff) -> Result<()> {
    let namespace = policy.namespace().unwrap_or_default();
    let provider = resolve_provider(
        &ctx.client,
        &ctx.providers,
        &policy.spec.provider_ref,
        &namespace,
    )
    .await
    .with_context(|| {
        format!(
            "failed to resolve DNS provider '{}' for DNSPolicy {}",
            policy.spec.provider_ref.name,
            policy_key(policy)
        )
    })?;

    let store = KubeRecordStore::new(ctx.client.clone());
    let reconciler = RecordReconciler {
        provider: provider.as_ref(),
        placement: &AnnotationPlacement,
        store: &store,
    };
    let orphaned = reconciler
        .delete_orphaned_records(
            policy,
            &ctx.stores.gateway_keys(),
            ctx.stores.namespace.as_deref(),
        )
        .await?;
    if orphaned > 0 {
        info!(policy = %policy_key(policy), records = orphaned, "Removed DNS records of deleted gateways");
    }
    reconciler.reconcile(policy, diff).await?;

    sync_gateway_annotations(&ctx.client, policy, diff).await
}

/// Merge patch moving the gateway to `policy`, or releasing it when `policy` is `None`.
///
/// Attaching sets the back-reference annotation and adds the DNS records finalizer;
/// releasing removes both. `None` when the gateway already matches.
#[must_use]
pub fn gateway_patch(gateway: &Gateway, policy: Option<&str>) -> Option<Value> {
    let current = gateway
        .annotations()
        .get(DNS_POLICY_ANNOTATION)
        .map(String::as_str);
    let finalized = has_finalizer(gateway, FINALIZER_GATEWAY_DNS);

    let (annotation, finalizers) = match policy {
        Some(key) if current == Some(key) && finalized => return None,
        None if current.is_none() && !finalized => return None,
        Some(key) => {
            let mut finalizers = gateway.finalizers().to_vec();
            if !finalized {
                finalizers.push(FINALIZER_GATEWAY_DNS.to_string());
            }
            (Value::String(key.to_string()), finalizers)
        }
        None => {
            let finalizers = gateway
                .finalizers()
                .iter()
                .filter(|f| *f != FINALIZER_GATEWAY_DNS)
                .cloned()
                .collect();
            (Value::Null, finalizers)
        }
    };

    let mut annotations = Map::new();
    annotations.insert(DNS_POLICY_ANNOTATION.to_string(), annotation);
    Some(json!({ "metadata": { "annotations": annotations, "finalizers": finalizers } }))
}

/// Annotate newly targeted gateways and release detached ones.
async fn sync_gateway_annotations(
    client: &Client,
    policy: &DNSPolicy,
    diff: &GatewayDiff,
) -> Result<()> {
    let key = policy_key(policy);
    for gateway in diff.missing.iter().chain(&diff.valid) {
        if let Some(patch) = gateway_patch(gateway, Some(&key)) {
            patch_gateway(client, gateway, &patch).await?;
            info!(policy = %key, gateway = %gateway_key(gateway), "Gateway attached to DNSPolicy");
        }
    }
    for gateway in &diff.invalid {
        if let Some(patch) = gateway_patch(gateway, None) {
            patch_gateway(client, gateway, &patch).await?;
            info!(policy = %key, gateway = %gateway_key(gateway), "Gateway released from DNSPolicy");
        }
    }
    Ok(())
}

async fn patch_gateway(client: &Client, gateway: &Gateway, body: &Value) -> Result<()> {
    let api: Api<Gateway> =
        Api::namespaced(client.clone(), &gateway.namespace().unwrap_or_default());
    let name = gateway.name_any();
    let patch = Patch::Merge(body);
    let params = PatchParams::default();
    retry_api_call(
        || api.patch(&name, &params, &patch),
        "patch Gateway metadata",
    )
    .await
    .with_context(|| {
        format!(
            "failed to update metadata of Gateway {}",
            gateway_key(gateway)
        )
    })?;
    Ok(())
}

/// Release every gateway still annotated for the policy, then drop the finalizer.
///
/// When the policy's `DNSProvider` or secret is already gone the DNS records can no longer
/// be removed from the provider; the record objects and annotations are still cleaned up
/// so deletion is never blocked.
async fn delete_dnspolicy(ctx: Arc<Context>, policy: DNSPolicy) -> Result<()> {
    let key = policy_key(&policy);
    if !has_finalizer(&policy, FINALIZER_DNS_POLICY) {
        return Ok(());
    }

    info!(policy = %key, "Deleting DNSPolicy, releasing gateways");
    let gateways = ctx.stores.gateways_for_policy(&policy);
    let diff = deletion_diff(&policy, &gateways);

    let namespace = policy.namespace().unwrap_or_default();
    let scope = ctx.stores.namespace.as_deref();
    match resolve_provider(
        &ctx.client,
        &ctx.providers,
        &policy.spec.provider_ref,
        &namespace,
    )
    .await
    {
        Ok(provider) => {
            let store = KubeRecordStore::new(ctx.client.clone());
            let reconciler = RecordReconciler {
                provider: provider.as_ref(),
                placement: &AnnotationPlacement,
                store: &store,
            };
            reconciler
                .reconcile(&policy, &diff)
                .await
                .with_context(|| format!("failed to remove DNS records of DNSPolicy {key}"))?;
            // records of gateways that were never annotated, or already gone
            reconciler
                .delete_orphaned_records(&policy, &BTreeSet::new(), scope)
                .await
                .with_context(|| format!("failed to remove DNS records of DNSPolicy {key}"))?;
        }
        Err(e) if e.is_not_found() => {
            warn!(policy = %key, error = %e, "DNS provider is gone, leaving provider records in place");
            delete_record_objects(&ctx.client, &policy, scope).await?;
        }
        Err(e) => return Err(e.into()),
    }

    sync_gateway_annotations(&ctx.client, &policy, &diff).await?;
    remove_finalizer(&ctx.client, &policy, FINALIZER_DNS_POLICY).await?;
    info!(policy = %key, "DNSPolicy released all gateways");
    Ok(())
}

/// Delete every `DNSRecord` object of the policy in `namespace` (all namespaces when `None`)
/// without touching the provider.
async fn delete_record_objects(
    client: &Client,
    policy: &DNSPolicy,
    namespace: Option<&str>,
) -> Result<()> {
    let store = KubeRecordStore::new(client.clone());
    let records = store
        .list_by_labels(namespace, &policy_record_labels(policy))
        .await?;
    for record in records {
        match store.delete(&record).await {
            Err(e) if !e.is_not_found() => return Err(anyhow::Error::from(e)),
            _ => metrics::record_dns_record_deleted(&record.namespace().unwrap_or_default()),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "dnspolicy_tests.rs"]
mod dnspolicy_tests;
