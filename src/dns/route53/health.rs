// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route53 health checks.

use super::client::{HealthCheckRequest, Route53Api};
use crate::constants::{
    DEFAULT_HEALTH_CHECK_FAILURE_THRESHOLD, ROUTE53_CALLER_REFERENCE_PREFIX_LEN,
    ROUTE53_HEALTH_CHECK_INTERVAL_SECS,
};
use crate::crd::{HealthCheckSpec, HealthProtocol};
use crate::dns::health::{
    health_check_reference, HealthCheckOutcome, HealthCheckReconciler, HealthCheckResult,
};
use crate::dns_errors::DnsError;
use crate::metrics;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// Creates Route53 health checks tagged with their health check reference.
///
/// Route53 never accepts a caller reference twice, not even after the check was deleted, so
/// every creation appends a random nonce to the first
/// [`ROUTE53_CALLER_REFERENCE_PREFIX_LEN`] characters of the reference. Existing checks are
/// found again by listing and matching that prefix.
pub struct Route53HealthCheckReconciler {
    api: Arc<dyn Route53Api>,
}

impl Route53HealthCheckReconciler {
    pub fn new(api: Arc<dyn Route53Api>) -> Self {
        Self { api }
    }
}

/// `<reference prefix>-<nonce>`, unique per creation.
fn caller_reference(reference: &str) -> String {
    format!(
        "{}-{:016x}",
        reference_prefix(reference),
        rand::rng().random::<u64>()
    )
}

fn reference_prefix(reference: &str) -> &str {
    &reference[..ROUTE53_CALLER_REFERENCE_PREFIX_LEN.min(reference.len())]
}

fn request_for(spec: &HealthCheckSpec, address: &str) -> HealthCheckRequest {
    let https = spec.protocol == HealthProtocol::Https;
    HealthCheckRequest {
        address: address.to_string(),
        port: spec.port.unwrap_or(if https { 443 } else { 80 }),
        resource_path: spec.endpoint.clone(),
        https,
        failure_threshold: spec
            .failure_threshold
            .unwrap_or(DEFAULT_HEALTH_CHECK_FAILURE_THRESHOLD),
        request_interval: ROUTE53_HEALTH_CHECK_INTERVAL_SECS,
    }
}

#[async_trait]
impl HealthCheckReconciler for Route53HealthCheckReconciler {
    async fn reconcile(
        &self,
        spec: &HealthCheckSpec,
        address: &str,
    ) -> Result<HealthCheckResult, DnsError> {
        let reference = health_check_reference(spec, address);
        if let Some(id) = self.api.find_health_check(reference_prefix(&reference)).await? {
            debug!(address, id = %id, "Route53 health check already exists");
            return Ok(HealthCheckResult {
                outcome: HealthCheckOutcome::Unchanged,
                id,
            });
        }

        let id = self
            .api
            .create_health_check(&caller_reference(&reference), &request_for(spec, address))
            .await?;
        metrics::record_health_check_operation("create");
        info!(address, id = %id, "Route53 health check created");
        Ok(HealthCheckResult {
            outcome: HealthCheckOutcome::Created,
            id,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), DnsError> {
        self.api.delete_health_check(id).await?;
        metrics::record_health_check_operation("delete");
        info!(id, "Route53 health check deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod health_tests;
