// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSRecord` reconciliation for the gateways affected by one `DNSPolicy`.
//!
//! A pass works on a [`GatewayDiff`]:
//!
//! 1. **Invalid** gateways (no longer referencing the policy, or being deleted) lose every
//!    `DNSRecord` labelled with the gateway and the policy. The provider records go first,
//!    then the objects.
//! 2. **Valid** and **missing** gateways get one `DNSRecord` per listener hostname inside a
//!    known zone, holding the endpoints of every placed cluster with routes attached to any
//!    listener of that hostname. Records the gateway no longer produces are removed.
//!
//! Invalid gateways are always handled first so a detached gateway frees its DNS names
//! before another gateway claims them in the same pass.
//!
//! Any failure aborts the pass, except a failing attachment query: a cluster whose queries
//! all failed is logged and skipped while the others still publish.
//!
//! Records whose gateway disappeared without going through the invalid path are found by
//! [`RecordReconciler::delete_orphaned_records`].

use crate::constants::{DEFAULT_TTL_SECS, WILDCARD_NAME};
use crate::crd::{DNSPolicy, DNSRecord, DNSRecordSpec, Endpoint, Gateway};
use crate::dns::target::{ClusterGateway, MultiClusterGatewayTarget};
use crate::dns::{find_matching_zone, Provider, Zone, ZoneList};
use crate::dns_errors::{is_kube_not_found, DnsError};
use crate::labels::{
    GATEWAY_LABEL, GATEWAY_NAMESPACE_LABEL, K8S_MANAGED_BY, K8S_PART_OF, MANAGED_BY_DNS_POLICY,
    PART_OF_GATEWAYDNS, POLICY_LABEL, POLICY_NAMESPACE_LABEL,
};
use crate::metrics;
use crate::placement::Placement;
use crate::reconcilers::pagination::list_all_paginated;
use crate::reconcilers::retry::retry_api_call;
use crate::reconcilers::status::update_condition_in_memory;
use crate::selector::gateway_key;
use crate::status_reasons::{CONDITION_TYPE_READY, REASON_RECORD_PUBLISHED, STATUS_TRUE};
use async_trait::async_trait;
use futures::future::join_all;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::ObjectMeta;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Gateways affected by one policy, split by how they reference it.
///
/// Every gateway appears in exactly one list.
#[derive(Clone, Debug, Default)]
pub struct GatewayDiff {
    /// Targeted by the policy and already annotated with it
    pub valid: Vec<Gateway>,
    /// Annotated with the policy but no longer targeted, or being deleted
    pub invalid: Vec<Gateway>,
    /// Newly targeted, not annotated yet
    pub missing: Vec<Gateway>,
}

/// Persistence of `DNSRecord` objects.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record. Fails with AlreadyExists when the name is taken.
    async fn create(&self, record: &DNSRecord) -> Result<DNSRecord, DnsError>;

    async fn get(&self, namespace: &str, name: &str) -> Result<DNSRecord, DnsError>;

    /// Records carrying every label in `labels`, in `namespace` or in all namespaces.
    async fn list_by_labels(
        &self,
        namespace: Option<&str>,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DNSRecord>, DnsError>;

    /// Delete a record. A record that is already gone is not an error.
    async fn delete(&self, record: &DNSRecord) -> Result<(), DnsError>;

    /// Persist `record.spec`.
    async fn update_spec(&self, record: &DNSRecord) -> Result<DNSRecord, DnsError>;

    /// Persist `record.status`.
    async fn update_status(&self, record: &DNSRecord) -> Result<DNSRecord, DnsError>;
}

/// [`RecordStore`] backed by the Kubernetes API.
pub struct KubeRecordStore {
    client: Client,
}

impl KubeRecordStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<DNSRecord> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl RecordStore for KubeRecordStore {
    async fn create(&self, record: &DNSRecord) -> Result<DNSRecord, DnsError> {
        let api = self.api(&record.namespace().unwrap_or_default());
        let params = PostParams::default();
        let created = retry_api_call(|| api.create(&params, record), "create DNSRecord").await?;
        Ok(created)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<DNSRecord, DnsError> {
        let api = self.api(namespace);
        Ok(retry_api_call(|| api.get(name), "get DNSRecord").await?)
    }

    async fn list_by_labels(
        &self,
        namespace: Option<&str>,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DNSRecord>, DnsError> {
        let api = match namespace {
            Some(ns) => self.api(ns),
            None => Api::all(self.client.clone()),
        };
        let params = ListParams::default().labels(&label_selector(labels));
        Ok(retry_api_call(
            || list_all_paginated(&api, params.clone()),
            "list DNSRecords",
        )
        .await?)
    }

    async fn delete(&self, record: &DNSRecord) -> Result<(), DnsError> {
        let api = self.api(&record.namespace().unwrap_or_default());
        let name = record.name_any();
        let params = DeleteParams::default();
        match retry_api_call(|| api.delete(&name, &params), "delete DNSRecord").await {
            Ok(_) => Ok(()),
            Err(e) if is_kube_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_spec(&self, record: &DNSRecord) -> Result<DNSRecord, DnsError> {
        let api = self.api(&record.namespace().unwrap_or_default());
        let name = record.name_any();
        let body = json!({ "spec": record.spec });
        let patch = Patch::Merge(&body);
        let params = PatchParams::default();
        Ok(retry_api_call(
            || api.patch(&name, &params, &patch),
            "patch DNSRecord spec",
        )
        .await?)
    }

    async fn update_status(&self, record: &DNSRecord) -> Result<DNSRecord, DnsError> {
        let api = self.api(&record.namespace().unwrap_or_default());
        let name = record.name_any();
        let body = json!({ "status": record.status });
        let patch = Patch::Merge(&body);
        let params = PatchParams::default();
        Ok(retry_api_call(
            || api.patch_status(&name, &params, &patch),
            "patch DNSRecord status",
        )
        .await?)
    }
}

/// `k1=v1,k2=v2` selector for a label map.
fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Labels tying a record to its policy.
#[must_use]
pub fn policy_record_labels(policy: &DNSPolicy) -> BTreeMap<String, String> {
    BTreeMap::from([
        (POLICY_LABEL.to_string(), policy.name_any()),
        (
            POLICY_NAMESPACE_LABEL.to_string(),
            policy.namespace().unwrap_or_default(),
        ),
    ])
}

/// Labels tying a record to its gateway and policy.
#[must_use]
pub fn record_owner_labels(gateway: &Gateway, policy: &DNSPolicy) -> BTreeMap<String, String> {
    let mut labels = policy_record_labels(policy);
    labels.insert(GATEWAY_LABEL.to_string(), gateway.name_any());
    labels.insert(
        GATEWAY_NAMESPACE_LABEL.to_string(),
        gateway.namespace().unwrap_or_default(),
    );
    labels
}

/// `namespace/name` of the gateway a record was created for, read from its labels.
#[must_use]
pub fn record_gateway_key(record: &DNSRecord) -> Option<String> {
    let labels = record.labels();
    let name = labels.get(GATEWAY_LABEL)?;
    let namespace = labels.get(GATEWAY_NAMESPACE_LABEL)?;
    Some(format!("{namespace}/{name}"))
}

/// Name of the record for `subdomain` of `gateway` in zone `zone_id`:
/// `<gateway>-<subdomain>-<zone hash>`, lower-cased, with `*` spelled `wildcard`.
///
/// The zone hash is the first 8 hex characters of the SHA-256 of the zone id, so the same
/// subdomain in two zones gets two records.
#[must_use]
pub fn record_name(gateway: &str, subdomain: &str, zone_id: &str) -> String {
    let zone_hash = format!("{:x}", Sha256::digest(zone_id.as_bytes()));
    format!("{gateway}-{subdomain}-{}", &zone_hash[..8])
        .replace('*', WILDCARD_NAME)
        .to_lowercase()
}

/// Listener names per hostname, skipping listeners without one.
fn listeners_by_host(gateway: &Gateway) -> BTreeMap<&str, Vec<&str>> {
    let mut hosts: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for listener in &gateway.spec.listeners {
        if let Some(host) = listener.hostname.as_deref().filter(|h| !h.is_empty()) {
            hosts.entry(host).or_default().push(listener.name.as_str());
        }
    }
    hosts
}

/// Health check ids referenced by `endpoints` through `property`.
fn health_check_ids<'a>(
    endpoints: impl IntoIterator<Item = &'a Endpoint>,
    property: &str,
) -> HashSet<String> {
    endpoints
        .into_iter()
        .filter_map(|ep| ep.provider_specific_property(property))
        .map(str::to_string)
        .collect()
}

/// Every endpoint a record may have published: its spec and its last published status.
fn known_endpoints(record: &DNSRecord) -> impl Iterator<Item = &Endpoint> {
    record.spec.endpoints.iter().chain(
        record
            .status
            .iter()
            .flat_map(|status| status.endpoints.iter()),
    )
}

/// Attachment query results of one placed cluster across the listeners of a hostname.
#[derive(Default)]
struct Attachment {
    routes: i32,
    answered: usize,
    failures: Vec<String>,
}

/// Runs record reconciliation passes against one provider.
pub struct RecordReconciler<'a> {
    pub provider: &'a dyn Provider,
    pub placement: &'a dyn Placement,
    pub store: &'a dyn RecordStore,
}

impl RecordReconciler<'_> {
    /// Reconcile every gateway in `diff` for `policy`.
    ///
    /// # Errors
    ///
    /// The first error of any gateway aborts the pass. Attachment query failures are
    /// not errors.
    pub async fn reconcile(&self, policy: &DNSPolicy, diff: &GatewayDiff) -> Result<(), DnsError> {
        for gateway in &diff.invalid {
            self.delete_gateway_records(gateway, policy).await?;
        }

        if diff.valid.is_empty() && diff.missing.is_empty() {
            return Ok(());
        }

        let zones = self.provider.list_zones().await?;
        for gateway in diff.valid.iter().chain(&diff.missing) {
            self.reconcile_gateway(gateway, policy, &zones).await?;
        }
        Ok(())
    }

    /// Remove every record the gateway holds for the policy, from the provider and the store.
    ///
    /// # Errors
    ///
    /// Provider failures and store failures other than NotFound.
    pub async fn delete_gateway_records(
        &self,
        gateway: &Gateway,
        policy: &DNSPolicy,
    ) -> Result<(), DnsError> {
        let namespace = gateway.namespace().unwrap_or_default();
        let records = self
            .store
            .list_by_labels(Some(&namespace), &record_owner_labels(gateway, policy))
            .await?;
        for record in records {
            self.delete_record(&record).await?;
            info!(
                gateway = %gateway_key(gateway),
                record = %record.name_any(),
                "Deleted DNS record"
            );
        }
        Ok(())
    }

    /// Remove the records of `policy` whose gateway is not in `live_gateways`.
    ///
    /// `namespace` limits the search to the namespace the gateways were listed from. Records
    /// without gateway labels are left alone. Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Provider failures and store failures other than NotFound.
    pub async fn delete_orphaned_records(
        &self,
        policy: &DNSPolicy,
        live_gateways: &BTreeSet<String>,
        namespace: Option<&str>,
    ) -> Result<usize, DnsError> {
        let records = self
            .store
            .list_by_labels(namespace, &policy_record_labels(policy))
            .await?;

        let mut removed = 0;
        for record in records {
            let Some(gateway) = record_gateway_key(&record) else {
                continue;
            };
            if live_gateways.contains(&gateway) {
                continue;
            }
            self.delete_record(&record).await?;
            removed += 1;
            info!(gateway = %gateway, record = %record.name_any(), "Deleted DNS record of a gateway that no longer exists");
        }
        Ok(removed)
    }

    /// Unpublish `record`, drop its health checks and delete the object.
    ///
    /// Health checks referenced by the spec or by the last published status are both
    /// removed, so a record emptied by a pass with no eligible cluster still frees them.
    async fn delete_record(&self, record: &DNSRecord) -> Result<(), DnsError> {
        self.provider.delete(record).await?;

        let property = self.provider.provider_specific().health_check_id;
        for id in health_check_ids(known_endpoints(record), &property) {
            if let Err(e) = self.provider.health_check_reconciler().delete(&id).await {
                warn!(record = %record.name_any(), health_check = %id, error = %e, "Failed to delete health check");
            }
        }

        match self.store.delete(record).await {
            Err(e) if !e.is_not_found() => return Err(e),
            _ => {}
        }
        metrics::record_dns_record_deleted(&record.namespace().unwrap_or_default());
        Ok(())
    }

    async fn reconcile_gateway(
        &self,
        gateway: &Gateway,
        policy: &DNSPolicy,
        zones: &ZoneList,
    ) -> Result<(), DnsError> {
        let key = gateway_key(gateway);
        let clusters = self.placement.get_placed_clusters(gateway).await?;
        debug!(gateway = %key, clusters = clusters.len(), "Reconciling gateway DNS");

        let mut wanted = BTreeSet::new();
        for (host, listeners) in listeners_by_host(gateway) {
            let (zone, subdomain) = match find_matching_zone(host, host, zones) {
                Ok(found) => found,
                Err(e) => {
                    debug!(gateway = %key, ?listeners, host, error = %e, "Skipping hostname");
                    continue;
                }
            };

            let cluster_gateways = self
                .attached_cluster_gateways(gateway, &listeners, &clusters)
                .await?;

            let record = self
                .get_or_create_record(gateway, policy, &subdomain, &zone)
                .await?;
            wanted.insert(record.name_any());

            let mut target = MultiClusterGatewayTarget::new(
                key.clone(),
                cluster_gateways,
                policy.spec.load_balancing.clone(),
            );
            self.attach_health_checks(policy, &mut target).await?;
            let endpoints = target.endpoints(
                host,
                policy.spec.ttl.unwrap_or(DEFAULT_TTL_SECS),
                &self.provider.provider_specific(),
            );
            self.set_endpoints(record, endpoints).await?;
        }

        self.prune_gateway_records(gateway, policy, &wanted).await
    }

    /// Delete records of the gateway no hostname produced in this pass, left behind by a
    /// removed listener or a hostname that moved to another zone.
    async fn prune_gateway_records(
        &self,
        gateway: &Gateway,
        policy: &DNSPolicy,
        wanted: &BTreeSet<String>,
    ) -> Result<(), DnsError> {
        let namespace = gateway.namespace().unwrap_or_default();
        let records = self
            .store
            .list_by_labels(Some(&namespace), &record_owner_labels(gateway, policy))
            .await?;
        for record in records.iter().filter(|r| !wanted.contains(&r.name_any())) {
            self.delete_record(record).await?;
            info!(gateway = %gateway_key(gateway), record = %record.name_any(), "Deleted DNS record no listener publishes");
        }
        Ok(())
    }

    /// Cluster gateways of every placed cluster with at least one route on any of
    /// `listeners`.
    ///
    /// Attachment queries run concurrently; a cluster is skipped only when every one of
    /// its queries failed.
    async fn attached_cluster_gateways(
        &self,
        gateway: &Gateway,
        listeners: &[&str],
        clusters: &BTreeSet<String>,
    ) -> Result<Vec<ClusterGateway>, DnsError> {
        let queries = clusters.iter().flat_map(|cluster| {
            listeners.iter().map(move |listener| async move {
                let result = self
                    .placement
                    .listener_total_attached_routes(gateway, listener, cluster)
                    .await;
                (cluster, *listener, result)
            })
        });

        let mut attachments: BTreeMap<&String, Attachment> = BTreeMap::new();
        for (cluster, listener, result) in join_all(queries).await {
            let attachment = attachments.entry(cluster).or_default();
            match result {
                Ok(routes) => {
                    attachment.routes = attachment.routes.saturating_add(routes);
                    attachment.answered += 1;
                }
                Err(e) => attachment.failures.push(format!("{listener}: {e}")),
            }
        }

        let mut cluster_gateways = Vec::new();
        for (cluster, attachment) in attachments {
            if attachment.answered == 0 {
                warn!(gateway = %gateway_key(gateway), cluster = %cluster, failures = ?attachment.failures, "Attachment query failed, skipping cluster");
                metrics::record_cluster_skipped("query_failed");
                continue;
            }
            if !attachment.failures.is_empty() {
                warn!(gateway = %gateway_key(gateway), cluster = %cluster, failures = ?attachment.failures, "Some attachment queries failed");
            }
            if attachment.routes <= 0 {
                debug!(gateway = %gateway_key(gateway), ?listeners, cluster = %cluster, "No attached routes");
                metrics::record_cluster_skipped("no_routes");
                continue;
            }

            let mut cg = self.placement.get_cluster_gateway(gateway, cluster).await?;
            cg.attached_routes = attachment.routes;
            cluster_gateways.push(cg);
        }
        Ok(cluster_gateways)
    }

    /// Reconcile a health check for every cluster published as an endpoint of its own.
    ///
    /// Clusters merged into a shared endpoint get none, since nothing could reference it.
    async fn attach_health_checks(
        &self,
        policy: &DNSPolicy,
        target: &mut MultiClusterGatewayTarget,
    ) -> Result<(), DnsError> {
        let Some(spec) = &policy.spec.health_check else {
            return Ok(());
        };
        let checked = target.health_checked_clusters();
        let reconciler = self.provider.health_check_reconciler();
        for cg in target
            .cluster_gateways
            .iter_mut()
            .filter(|cg| checked.contains(&cg.cluster_name))
        {
            if let Some(address) = cg.addresses.first() {
                let result = reconciler.reconcile(spec, address).await?;
                cg.health_check_id = Some(result.id);
            }
        }
        Ok(())
    }

    /// Create the record for `(gateway, policy, subdomain, zone)`, or fetch it when it exists.
    ///
    /// New records are owned by the gateway, and by the policy when it lives in the same
    /// namespace, so the API server collects them with either.
    async fn get_or_create_record(
        &self,
        gateway: &Gateway,
        policy: &DNSPolicy,
        subdomain: &str,
        zone: &Zone,
    ) -> Result<DNSRecord, DnsError> {
        let namespace = gateway.namespace().unwrap_or_default();
        let name = record_name(&gateway.name_any(), subdomain, &zone.id);

        let mut labels = record_owner_labels(gateway, policy);
        labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_DNS_POLICY.to_string());
        labels.insert(K8S_PART_OF.to_string(), PART_OF_GATEWAYDNS.to_string());

        let mut owners: Vec<_> = gateway.owner_ref(&()).into_iter().collect();
        if policy.namespace().as_deref() == Some(namespace.as_str()) {
            owners.extend(policy.owner_ref(&()));
        }

        let record = DNSRecord {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                labels: Some(labels),
                owner_references: (!owners.is_empty()).then_some(owners),
                ..Default::default()
            },
            spec: DNSRecordSpec {
                zone_id: zone.id.clone(),
                endpoints: Vec::new(),
            },
            status: None,
        };

        match self.store.create(&record).await {
            Ok(created) => {
                metrics::record_dns_record_created(&namespace);
                info!(record = %name, zone = %zone.dns_name, "Created DNS record");
                Ok(created)
            }
            Err(e) if e.is_already_exists() => self.store.get(&namespace, &name).await,
            Err(e) => Err(e),
        }
    }

    /// Make `endpoints` the complete endpoint set of `record` and publish it.
    ///
    /// `status.endpoints` is only rewritten after a provider call, so stale SetIDs stay
    /// tracked while `spec.endpoints` is empty.
    async fn set_endpoints(
        &self,
        mut record: DNSRecord,
        endpoints: Vec<Endpoint>,
    ) -> Result<(), DnsError> {
        let namespace = record.namespace().unwrap_or_default();
        if record.spec.endpoints != endpoints {
            record.spec.endpoints = endpoints;
            record = self.store.update_spec(&record).await?;
            metrics::record_dns_record_updated(&namespace);
        }

        self.provider.ensure(&record).await?;

        if record.spec.endpoints.is_empty() {
            debug!(record = %record.name_any(), "No eligible clusters, nothing published");
            return Ok(());
        }

        let health_check_property = self.provider.provider_specific().health_check_id;
        let mut status = record.status.clone().unwrap_or_default();
        let current = health_check_ids(&record.spec.endpoints, &health_check_property);
        for id in health_check_ids(&status.endpoints, &health_check_property) {
            if current.contains(&id) {
                continue;
            }
            if let Err(e) = self.provider.health_check_reconciler().delete(&id).await {
                warn!(record = %record.name_any(), health_check = %id, error = %e, "Failed to delete stale health check");
            }
        }

        status.endpoints.clone_from(&record.spec.endpoints);
        status.observed_generation = record.metadata.generation;
        update_condition_in_memory(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            REASON_RECORD_PUBLISHED,
            &format!("{} endpoint(s) published", status.endpoints.len()),
        );
        record.status = Some(status);
        self.store.update_status(&record).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "dnsrecords_tests.rs"]
mod dnsrecords_tests;
