// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory Route53 API for unit tests.

use super::client::{Change, HealthCheckRequest, HostedZone, HostedZonePage, Route53Api};
use crate::dns_errors::DnsError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// A health check the fake API holds.
#[derive(Clone, Debug)]
pub struct FakeHealthCheck {
    pub id: String,
    pub caller_reference: String,
    pub request: HealthCheckRequest,
}

/// Serves hosted zones in fixed-size pages and records every call.
///
/// Health checks follow Route53 rules: a caller reference is refused once used, even after
/// its check was deleted.
#[derive(Default)]
pub struct FakeRoute53Api {
    pub zones: Vec<HostedZone>,
    pub page_size: usize,
    pub list_calls: Mutex<Vec<(Option<String>, Option<i32>)>>,
    pub change_batches: Mutex<Vec<(String, Vec<Change>)>>,
    pub health_checks: Mutex<Vec<FakeHealthCheck>>,
    pub used_references: Mutex<HashSet<String>>,
    pub created_health_checks: Mutex<usize>,
    pub deleted_health_checks: Mutex<Vec<String>>,
    pub fail_with: Option<String>,
}

impl FakeRoute53Api {
    pub fn with_zones(zones: &[(&str, &str)]) -> Self {
        Self {
            zones: zones
                .iter()
                .map(|(id, name)| HostedZone {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
            page_size: 100,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<(String, Vec<Change>)> {
        self.change_batches.lock().unwrap().clone()
    }

    fn check_failure(&self, operation: &str) -> Result<(), DnsError> {
        match &self.fail_with {
            Some(message) => Err(DnsError::provider(operation, message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Route53Api for FakeRoute53Api {
    async fn list_hosted_zones(
        &self,
        marker: Option<String>,
        max_items: Option<i32>,
    ) -> Result<HostedZonePage, DnsError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((marker.clone(), max_items));
        self.check_failure("ListHostedZones")?;

        let start: usize = marker.map_or(0, |m| m.parse().unwrap());
        let size = max_items.map_or(self.page_size, |m| m as usize);
        let end = (start + size).min(self.zones.len());
        Ok(HostedZonePage {
            zones: self.zones[start..end].to_vec(),
            next_marker: (end < self.zones.len()).then(|| end.to_string()),
        })
    }

    async fn change_resource_record_sets(
        &self,
        zone_id: &str,
        changes: &[Change],
    ) -> Result<(), DnsError> {
        self.check_failure("ChangeResourceRecordSets")?;
        self.change_batches
            .lock()
            .unwrap()
            .push((zone_id.to_string(), changes.to_vec()));
        Ok(())
    }

    async fn create_health_check(
        &self,
        caller_reference: &str,
        request: &HealthCheckRequest,
    ) -> Result<String, DnsError> {
        self.check_failure("CreateHealthCheck")?;
        if !self
            .used_references
            .lock()
            .unwrap()
            .insert(caller_reference.to_string())
        {
            return Err(DnsError::provider(
                "CreateHealthCheck",
                "HealthCheckAlreadyExists: caller reference already used",
            ));
        }
        let mut created = self.created_health_checks.lock().unwrap();
        *created += 1;
        let id = format!("hc-{}", *created);
        self.health_checks.lock().unwrap().push(FakeHealthCheck {
            id: id.clone(),
            caller_reference: caller_reference.to_string(),
            request: request.clone(),
        });
        Ok(id)
    }

    async fn find_health_check(&self, prefix: &str) -> Result<Option<String>, DnsError> {
        self.check_failure("ListHealthChecks")?;
        Ok(self
            .health_checks
            .lock()
            .unwrap()
            .iter()
            .find(|hc| hc.caller_reference.starts_with(prefix))
            .map(|hc| hc.id.clone()))
    }

    async fn delete_health_check(&self, id: &str) -> Result<(), DnsError> {
        self.check_failure("DeleteHealthCheck")?;
        self.health_checks.lock().unwrap().retain(|hc| hc.id != id);
        self.deleted_health_checks
            .lock()
            .unwrap()
            .push(id.to_string());
        Ok(())
    }
}
