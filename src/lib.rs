// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # gatewaydns - Multi-cluster Gateway DNS controller for Kubernetes
//!
//! gatewaydns publishes DNS records for Gateway API gateways that are placed onto a
//! changing set of member clusters. A `DNSPolicy` attaches to a hub `Gateway`; for every
//! listener hostname the controller computes which clusters have routes attached and
//! keeps the provider's answer for that hostname pointing at exactly those clusters.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types (`DNSPolicy`, `DNSRecord`, `DNSProvider`)
//! - [`dns`] - Zone matching, target aggregation and DNS provider backends
//! - [`placement`] - Which clusters a gateway runs on and what each reports
//! - [`reconcilers`] - Reconciliation logic for policies and records
//! - [`context`] - Shared context and reflector stores for the controller
//! - [`selector`] - Label selector matching and watch mapping
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use gatewaydns::dns::target::{ClusterGateway, MultiClusterGatewayTarget};
//! use gatewaydns::dns::ProviderSpecificLabels;
//!
//! let clusters = vec![
//!     ClusterGateway {
//!         cluster_name: "eu-west-1".to_string(),
//!         addresses: vec!["192.0.2.10".to_string()],
//!         attached_routes: 1,
//!         ..Default::default()
//!     },
//!     ClusterGateway {
//!         cluster_name: "us-east-1".to_string(),
//!         addresses: vec!["192.0.2.20".to_string()],
//!         attached_routes: 2,
//!         ..Default::default()
//!     },
//! ];
//! let labels = ProviderSpecificLabels {
//!     weight: "weight".to_string(),
//!     health_check_id: "aws/health-check-id".to_string(),
//! };
//!
//! let target = MultiClusterGatewayTarget::new("gateways/prod-web", clusters, None);
//! let endpoints = target.endpoints("api.example.com", 60, &labels);
//!
//! assert_eq!(endpoints.len(), 1);
//! assert_eq!(endpoints[0].targets, vec!["192.0.2.10", "192.0.2.20"]);
//! ```

pub mod constants;
pub mod context;
pub mod crd;
pub mod dns;
pub mod dns_errors;
pub mod labels;
pub mod metrics;
pub mod placement;
pub mod reconcilers;
pub mod selector;
pub mod status_reasons;
