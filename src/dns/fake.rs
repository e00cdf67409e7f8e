// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory provider and health check fakes for unit tests.

use super::health::{HealthCheckOutcome, HealthCheckReconciler, HealthCheckResult};
use super::{Provider, ProviderSpecificLabels, Zone, ZoneList};
use crate::crd::{DNSRecord, HealthCheckSpec};
use crate::dns_errors::DnsError;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared, ordered log of side effects across fakes.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub struct FakeHealthCheckReconciler {
    pub reconcile_calls: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeHealthCheckReconciler {
    pub fn new() -> Self {
        Self {
            reconcile_calls: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HealthCheckReconciler for FakeHealthCheckReconciler {
    async fn reconcile(
        &self,
        _spec: &HealthCheckSpec,
        address: &str,
    ) -> Result<HealthCheckResult, DnsError> {
        self.reconcile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(HealthCheckResult {
            outcome: HealthCheckOutcome::Created,
            id: format!("hc-{address}"),
        })
    }

    async fn delete(&self, id: &str) -> Result<(), DnsError> {
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// Provider recording `ensure`/`delete` calls into an [`EventLog`].
pub struct FakeProvider {
    pub zones: Vec<Zone>,
    pub log: EventLog,
    pub ensured: Mutex<Vec<DNSRecord>>,
    pub health: Arc<FakeHealthCheckReconciler>,
    pub fail_list_zones: bool,
}

impl FakeProvider {
    pub fn new(zones: Vec<Zone>, log: EventLog) -> Self {
        Self {
            zones,
            log,
            ensured: Mutex::new(Vec::new()),
            health: Arc::new(FakeHealthCheckReconciler::new()),
            fail_list_zones: false,
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn list_zones(&self) -> Result<ZoneList, DnsError> {
        if self.fail_list_zones {
            return Err(DnsError::provider("ListHostedZones", "boom, request id: 1"));
        }
        Ok(ZoneList {
            items: self.zones.clone(),
        })
    }

    async fn ensure(&self, record: &DNSRecord) -> Result<(), DnsError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("provider.ensure {}", record.name_any()));
        self.ensured.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn delete(&self, record: &DNSRecord) -> Result<(), DnsError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("provider.delete {}", record.name_any()));
        Ok(())
    }

    fn health_check_reconciler(&self) -> Arc<dyn HealthCheckReconciler> {
        self.health.clone()
    }

    fn provider_specific(&self) -> ProviderSpecificLabels {
        ProviderSpecificLabels {
            weight: "weight".to_string(),
            health_check_id: "fake/health-check-id".to_string(),
        }
    }
}
