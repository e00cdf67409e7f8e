// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider-side health checks for endpoint targets.
//!
//! A [`HealthCheckReconciler`] makes sure a provider health check exists for one cluster
//! gateway address and returns its id, which the target aggregator then attaches to that
//! cluster's endpoint. Providers hand out a [`CachedHealthCheckReconciler`] so repeated
//! passes reuse known ids instead of calling the backend again.

use crate::crd::HealthCheckSpec;
use crate::dns_errors::DnsError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// What a reconcile call did to the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthCheckOutcome {
    /// A new health check was created
    Created,
    /// An existing health check already matched
    Unchanged,
}

/// Result of reconciling one health check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub outcome: HealthCheckOutcome,
    /// Provider id of the health check
    pub id: String,
}

/// Creates and deletes provider health checks.
#[async_trait]
pub trait HealthCheckReconciler: Send + Sync {
    /// Ensure a health check probing `address` per `spec` exists.
    async fn reconcile(
        &self,
        spec: &HealthCheckSpec,
        address: &str,
    ) -> Result<HealthCheckResult, DnsError>;

    /// Delete the health check with this id. Deleting an unknown id succeeds.
    async fn delete(&self, id: &str) -> Result<(), DnsError>;
}

/// Stable identity of a health check: the same address and spec always hash to the same
/// 64 character hex reference, which backends use to find a check they created before.
#[must_use]
pub fn health_check_reference(spec: &HealthCheckSpec, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    hasher.update(b"|");
    hasher.update(spec.endpoint.as_bytes());
    hasher.update(b"|");
    hasher.update(spec.port.unwrap_or_default().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(format!("{:?}", spec.protocol).as_bytes());
    hasher.update(b"|");
    hasher.update(
        spec.failure_threshold
            .unwrap_or_default()
            .to_string()
            .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}

/// Remembers the id of every health check reconciled through it.
///
/// Each provider instance owns one, built lazily on first use. Providers are reused across
/// passes until their `DNSProvider` or secret changes, and the cache lives as long.
pub struct CachedHealthCheckReconciler {
    inner: Arc<dyn HealthCheckReconciler>,
    ids: Mutex<HashMap<String, String>>,
}

impl CachedHealthCheckReconciler {
    pub fn new(inner: Arc<dyn HealthCheckReconciler>) -> Self {
        Self {
            inner,
            ids: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, reference: &str) -> Option<String> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
    }
}

#[async_trait]
impl HealthCheckReconciler for CachedHealthCheckReconciler {
    async fn reconcile(
        &self,
        spec: &HealthCheckSpec,
        address: &str,
    ) -> Result<HealthCheckResult, DnsError> {
        let reference = health_check_reference(spec, address);
        if let Some(id) = self.cached(&reference) {
            debug!(address, id = %id, "Health check found in cache");
            return Ok(HealthCheckResult {
                outcome: HealthCheckOutcome::Unchanged,
                id,
            });
        }

        let result = self.inner.reconcile(spec, address).await?;
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference, result.id.clone());
        Ok(result)
    }

    async fn delete(&self, id: &str) -> Result<(), DnsError> {
        self.inner.delete(id).await?;
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, cached| cached != id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod health_tests;
