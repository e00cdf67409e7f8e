// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Aggregation of multi-cluster gateway addresses into DNS endpoints.
//!
//! [`MultiClusterGatewayTarget`] is a value computed fresh for every listener hostname in
//! every pass. It has no identity of its own: build it, call
//! [`MultiClusterGatewayTarget::endpoints`], drop it.
//!
//! # Strategies
//!
//! | Load balancing | Endpoints |
//! |---|---|
//! | none | one A endpoint holding every cluster IP |
//! | weighted | one endpoint per cluster, `setIdentifier` = cluster, `weight` property |
//! | geo | one endpoint per geo code, `setIdentifier` = code, `geo-code` property |
//!
//! A and CNAME cannot share a name, so when clusters report both IP and hostname
//! addresses the IP addresses win and hostname-only clusters are left out.

use super::ProviderSpecificLabels;
use crate::constants::{DEFAULT_CNAME_TTL_SECS, DEFAULT_WEIGHT, PROVIDER_SPECIFIC_GEO_CODE};
use crate::crd::{Endpoint, LoadBalancingGeo, LoadBalancingSpec, LoadBalancingWeighted, RecordType};
use crate::labels::CLUSTER_GEO_CODE_LABEL;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use tracing::warn;

/// A gateway's ingress as deployed on one member cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterGateway {
    pub cluster_name: String,
    /// Ingress addresses, IPs or hostnames
    pub addresses: Vec<String>,
    /// Routes attached to the listener being resolved
    pub attached_routes: i32,
    /// Labels of the member cluster, matched by weight selectors and read for geo codes
    pub cluster_labels: BTreeMap<String, String>,
    /// Provider health check probing this cluster, when health checks are enabled
    pub health_check_id: Option<String>,
}

impl ClusterGateway {
    fn ipv4_targets(&self) -> Vec<String> {
        self.addresses
            .iter()
            .filter(|a| matches!(a.parse::<IpAddr>(), Ok(IpAddr::V4(_))))
            .cloned()
            .collect()
    }

    fn hostname_targets(&self) -> Vec<String> {
        self.addresses
            .iter()
            .filter(|a| a.parse::<IpAddr>().is_err())
            .cloned()
            .collect()
    }

    fn geo_code<'a>(&'a self, geo: &'a LoadBalancingGeo) -> &'a str {
        self.cluster_labels
            .get(CLUSTER_GEO_CODE_LABEL)
            .map_or(geo.default_geo.as_str(), String::as_str)
    }

    fn weight(&self, weighted: &LoadBalancingWeighted) -> i64 {
        weighted
            .custom
            .iter()
            .find(|custom| custom.selector.matches(&self.cluster_labels))
            .map_or(weighted.default_weight, |custom| custom.weight)
    }
}

/// The endpoints a multi-cluster gateway should publish for one hostname.
#[derive(Clone, Debug)]
pub struct MultiClusterGatewayTarget {
    /// `namespace/name` of the gateway, for logging
    pub gateway: String,
    pub cluster_gateways: Vec<ClusterGateway>,
    pub load_balancing: Option<LoadBalancingSpec>,
}

/// Targets of one endpoint variant before it is turned into an [`Endpoint`].
struct Variant {
    set_identifier: String,
    targets: Vec<String>,
    health_check_id: Option<String>,
}

impl MultiClusterGatewayTarget {
    /// Build a target from the eligible cluster gateways. Clusters are ordered by name so
    /// the resulting endpoints, and therefore provider calls, are deterministic.
    pub fn new(
        gateway: impl Into<String>,
        mut cluster_gateways: Vec<ClusterGateway>,
        load_balancing: Option<LoadBalancingSpec>,
    ) -> Self {
        cluster_gateways.sort_by(|a, b| a.cluster_name.cmp(&b.cluster_name));
        Self {
            gateway: gateway.into(),
            cluster_gateways,
            load_balancing,
        }
    }

    /// Split the cluster gateways into those that can be published and those left out.
    ///
    /// The first value is true when the endpoints are A records, which happens as soon as one
    /// cluster reports an IPv4 address.
    fn eligible(&self) -> (bool, Vec<&ClusterGateway>, Vec<&ClusterGateway>) {
        let use_ips = self
            .cluster_gateways
            .iter()
            .any(|cg| !cg.ipv4_targets().is_empty());
        let (eligible, dropped): (Vec<_>, Vec<_>) =
            self.cluster_gateways.iter().partition(|cg| {
                if use_ips {
                    !cg.ipv4_targets().is_empty()
                } else {
                    !cg.hostname_targets().is_empty()
                }
            });
        (use_ips, eligible, dropped)
    }

    /// Clusters published as an endpoint of their own, the only ones whose health check
    /// can be attached.
    ///
    /// The merged A endpoint without a strategy and geo codes shared by several clusters
    /// carry no health check.
    #[must_use]
    pub fn health_checked_clusters(&self) -> BTreeSet<String> {
        let (use_ips, eligible, _) = self.eligible();
        let strategy = self.load_balancing.as_ref();

        if let Some(geo) = strategy.and_then(|lb| lb.geo.as_ref()) {
            let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for cg in &eligible {
                groups
                    .entry(cg.geo_code(geo))
                    .or_default()
                    .push(cg.cluster_name.as_str());
            }
            return groups
                .into_values()
                .filter_map(|members| match members.as_slice() {
                    [only] => Some((*only).to_string()),
                    _ => None,
                })
                .collect();
        }

        let weighted = strategy.and_then(|lb| lb.weighted.as_ref()).is_some();
        if weighted || !use_ips {
            return eligible.iter().map(|cg| cg.cluster_name.clone()).collect();
        }
        BTreeSet::new()
    }

    /// Compute the endpoints for `hostname`.
    ///
    /// `default_ttl` applies to A endpoints; CNAME endpoints always use the CNAME TTL.
    /// Zero cluster gateways produce zero endpoints.
    #[must_use]
    pub fn endpoints(
        &self,
        hostname: &str,
        default_ttl: i64,
        labels: &ProviderSpecificLabels,
    ) -> Vec<Endpoint> {
        if self.cluster_gateways.is_empty() {
            return Vec::new();
        }

        let (use_ips, eligible, dropped) = self.eligible();
        let (record_type, ttl) = if use_ips {
            (RecordType::A, default_ttl)
        } else {
            (RecordType::CNAME, DEFAULT_CNAME_TTL_SECS)
        };
        for cg in dropped {
            warn!(
                gateway = %self.gateway,
                cluster = %cg.cluster_name,
                record_type = %record_type,
                "Cluster gateway has no usable address, leaving it out"
            );
        }

        let targets_of = |cg: &ClusterGateway| {
            if use_ips {
                cg.ipv4_targets()
            } else {
                cg.hostname_targets()
            }
        };

        let strategy = self.load_balancing.as_ref();
        if let Some(geo) = strategy.and_then(|lb| lb.geo.as_ref()) {
            return geo_variants(&eligible, geo, targets_of, record_type)
                .into_iter()
                .map(|(code, variant)| {
                    let mut ep = variant.into_endpoint(hostname, record_type, ttl, labels);
                    ep.set_provider_specific_property(PROVIDER_SPECIFIC_GEO_CODE, code);
                    ep
                })
                .collect();
        }

        if let Some(weighted) = strategy.and_then(|lb| lb.weighted.as_ref()) {
            return eligible
                .iter()
                .map(|cg| {
                    let variant = Variant::for_cluster(cg, targets_of(*cg), record_type);
                    let mut ep = variant.into_endpoint(hostname, record_type, ttl, labels);
                    ep.set_provider_specific_property(&labels.weight, cg.weight(weighted).to_string());
                    ep
                })
                .collect();
        }

        if use_ips {
            let mut targets: Vec<String> = Vec::new();
            for cg in &eligible {
                for ip in cg.ipv4_targets() {
                    if !targets.contains(&ip) {
                        targets.push(ip);
                    }
                }
            }
            return vec![Endpoint::new(hostname, RecordType::A, targets, ttl)];
        }

        // CNAME is single-valued, so hostname clusters are always published as variants
        eligible
            .iter()
            .map(|cg| {
                let variant = Variant::for_cluster(cg, targets_of(*cg), record_type);
                let mut ep = variant.into_endpoint(hostname, record_type, ttl, labels);
                ep.set_provider_specific_property(&labels.weight, DEFAULT_WEIGHT.to_string());
                ep
            })
            .collect()
    }
}

impl Variant {
    fn for_cluster(cg: &ClusterGateway, mut targets: Vec<String>, record_type: RecordType) -> Self {
        if record_type == RecordType::CNAME && targets.len() > 1 {
            warn!(
                cluster = %cg.cluster_name,
                dropped = ?&targets[1..],
                "CNAME takes a single target, using the first hostname"
            );
            targets.truncate(1);
        }
        Self {
            set_identifier: cg.cluster_name.clone(),
            targets,
            health_check_id: cg.health_check_id.clone(),
        }
    }

    fn into_endpoint(
        self,
        hostname: &str,
        record_type: RecordType,
        ttl: i64,
        labels: &ProviderSpecificLabels,
    ) -> Endpoint {
        let mut ep = Endpoint::new(hostname, record_type, self.targets, ttl);
        ep.set_identifier = self.set_identifier;
        if let Some(id) = self.health_check_id {
            ep.set_provider_specific_property(&labels.health_check_id, id);
        }
        ep
    }
}

/// Group clusters by geo code. A health check id survives only for single-cluster groups,
/// since one record set carries at most one health check.
fn geo_variants<F>(
    clusters: &[&ClusterGateway],
    geo: &LoadBalancingGeo,
    targets_of: F,
    record_type: RecordType,
) -> BTreeMap<String, Variant>
where
    F: Fn(&ClusterGateway) -> Vec<String>,
{
    let mut groups: BTreeMap<String, Vec<&ClusterGateway>> = BTreeMap::new();
    for cg in clusters {
        groups
            .entry(cg.geo_code(geo).to_string())
            .or_default()
            .push(*cg);
    }

    groups
        .into_iter()
        .map(|(code, members)| {
            let mut targets: Vec<String> = Vec::new();
            for cg in &members {
                for t in targets_of(*cg) {
                    if !targets.contains(&t) {
                        targets.push(t);
                    }
                }
            }
            if record_type == RecordType::CNAME {
                targets.truncate(1);
            }
            let health_check_id = match members.as_slice() {
                [only] => only.health_check_id.clone(),
                _ => None,
            };
            let variant = Variant {
                set_identifier: code.clone(),
                targets,
                health_check_id,
            };
            (code, variant)
        })
        .collect()
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod target_tests;
