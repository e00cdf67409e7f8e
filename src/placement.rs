// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Placement queries: which member clusters a gateway runs on and what each reports.
//!
//! The cluster-selection algorithm lives outside this controller. It publishes its result
//! on the hub `Gateway` as two annotations, read by [`AnnotationPlacement`]:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     gatewaydns.io/placed-clusters: "eu-west-1,us-east-1"
//!     gatewaydns.io/cluster-status: |
//!       {
//!         "eu-west-1": {
//!           "addresses": ["192.0.2.10"],
//!           "listeners": [{"name": "api", "attachedRoutes": 2}],
//!           "labels": {"gatewaydns.io/geo-code": "EU"}
//!         }
//!       }
//! ```

use crate::crd::Gateway;
use crate::dns::target::ClusterGateway;
use crate::dns_errors::DnsError;
use crate::labels::{CLUSTER_STATUS_ANNOTATION, PLACED_CLUSTERS_ANNOTATION};
use crate::selector::gateway_key;
use async_trait::async_trait;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Query interface of the placement subsystem.
#[async_trait]
pub trait Placement: Send + Sync {
    /// Clusters the gateway is currently placed on.
    async fn get_placed_clusters(&self, gateway: &Gateway) -> Result<BTreeSet<String>, DnsError>;

    /// Routes attached to `listener` of the gateway on `cluster`.
    async fn listener_total_attached_routes(
        &self,
        gateway: &Gateway,
        listener: &str,
        cluster: &str,
    ) -> Result<i32, DnsError>;

    /// The gateway's ingress on `cluster`.
    async fn get_cluster_gateway(
        &self,
        gateway: &Gateway,
        cluster: &str,
    ) -> Result<ClusterGateway, DnsError>;
}

/// Listener status reported by one cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListenerStatus {
    pub name: String,
    #[serde(default)]
    pub attached_routes: i32,
}

/// Gateway status reported by one cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub listeners: Vec<ListenerStatus>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// [`Placement`] backed by annotations on the hub gateway.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnnotationPlacement;

impl AnnotationPlacement {
    fn placement_error(gateway: &Gateway, cluster: &str, reason: impl Into<String>) -> DnsError {
        DnsError::Placement {
            gateway: gateway_key(gateway),
            cluster: cluster.to_string(),
            reason: reason.into(),
        }
    }

    fn cluster_status(gateway: &Gateway, cluster: &str) -> Result<ClusterStatus, DnsError> {
        let raw = gateway
            .annotations()
            .get(CLUSTER_STATUS_ANNOTATION)
            .ok_or_else(|| {
                Self::placement_error(gateway, cluster, "no cluster status reported")
            })?;
        let mut statuses: BTreeMap<String, ClusterStatus> = serde_json::from_str(raw)
            .map_err(|e| {
                Self::placement_error(gateway, cluster, format!("invalid cluster status: {e}"))
            })?;
        statuses.remove(cluster).ok_or_else(|| {
            Self::placement_error(gateway, cluster, "cluster has not reported status")
        })
    }
}

#[async_trait]
impl Placement for AnnotationPlacement {
    async fn get_placed_clusters(&self, gateway: &Gateway) -> Result<BTreeSet<String>, DnsError> {
        Ok(gateway
            .annotations()
            .get(PLACED_CLUSTERS_ANNOTATION)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn listener_total_attached_routes(
        &self,
        gateway: &Gateway,
        listener: &str,
        cluster: &str,
    ) -> Result<i32, DnsError> {
        let status = Self::cluster_status(gateway, cluster)?;
        Ok(status
            .listeners
            .iter()
            .filter(|l| l.name == listener)
            .map(|l| l.attached_routes)
            .fold(0i32, i32::saturating_add))
    }

    async fn get_cluster_gateway(
        &self,
        gateway: &Gateway,
        cluster: &str,
    ) -> Result<ClusterGateway, DnsError> {
        let status = Self::cluster_status(gateway, cluster)?;
        if status.addresses.is_empty() {
            return Err(Self::placement_error(
                gateway,
                cluster,
                "gateway has no addresses",
            ));
        }
        Ok(ClusterGateway {
            cluster_name: cluster.to_string(),
            addresses: status.addresses,
            attached_routes: 0,
            cluster_labels: status.labels,
            health_check_id: None,
        })
    }
}

#[cfg(test)]
#[path = "placement_tests.rs"]
mod placement_tests;
