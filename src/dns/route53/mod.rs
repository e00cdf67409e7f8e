// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! AWS Route53 DNS provider.
//!
//! # Change sets
//!
//! Every `ensure`/`delete` is one atomic `ChangeResourceRecordSets` call holding one change
//! per endpoint SetID:
//!
//! - `ensure`: `DELETE` for every endpoint in `status.endpoints` whose SetID left the record spec,
//!   then `UPSERT` for every endpoint in `spec.endpoints`
//! - `delete`: `DELETE` for every endpoint in `status.endpoints` or `spec.endpoints`, so SetIDs
//!   still published after a pass with no eligible cluster are removed too
//!
//! `ensure` on a record without spec endpoints makes no call at all.
//!
//! # Endpoint properties
//!
//! | Property | Route53 field |
//! |---|---|
//! | `weight` | `Weight` (unparseable values become 0) |
//! | `geo-code` | `GeoLocation.CountryCode` or `GeoLocation.ContinentCode` |
//! | `aws/geolocation-subdivision-code` | `GeoLocation.SubdivisionCode` unless a continent is set |
//! | `aws/region` | `Region` |
//! | `aws/failover` | `Failover` |
//! | `aws/multi-value-answer` | `MultiValueAnswer = true` |
//! | `aws/health-check-id` | `HealthCheckId` |

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod health;

use crate::constants::{
    AWS_ACCESS_KEY_ID_KEY, AWS_REGION_KEY, AWS_SECRET_ACCESS_KEY_KEY, DEFAULT_AWS_REGION,
    PROVIDER_SPECIFIC_GEO_CODE, PROVIDER_SPECIFIC_WEIGHT,
};
use crate::crd::{DNSProviderConfig, DNSRecord, Endpoint, RecordType};
use crate::dns::health::{CachedHealthCheckReconciler, HealthCheckReconciler};
use crate::dns::{
    remove_trailing_dot, GeoCode, Provider, ProviderSpecificLabels, Zone, ZoneIdFilter, ZoneList,
};
use crate::dns_errors::{DnsError, ValidationError};
use crate::metrics;
use async_trait::async_trait;
use client::{Change, ChangeAction, GeoLocation, ResourceRecordSet, Route53Api, SdkRoute53Api};
use health::Route53HealthCheckReconciler;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

pub const PROVIDER_SPECIFIC_REGION: &str = "aws/region";
pub const PROVIDER_SPECIFIC_FAILOVER: &str = "aws/failover";
pub const PROVIDER_SPECIFIC_GEOLOCATION_SUBDIVISION_CODE: &str = "aws/geolocation-subdivision-code";
pub const PROVIDER_SPECIFIC_MULTI_VALUE_ANSWER: &str = "aws/multi-value-answer";
pub const PROVIDER_SPECIFIC_HEALTH_CHECK_ID: &str = "aws/health-check-id";

/// Route53 implementation of [`Provider`].
pub struct Route53Provider {
    api: Arc<dyn Route53Api>,
    zone_id_filter: ZoneIdFilter,
    health_check_reconciler: OnceLock<Arc<dyn HealthCheckReconciler>>,
}

/// Read one secret key as UTF-8, from `data` or `stringData`. Missing keys read as empty.
fn secret_value(secret: &Secret, key: &str) -> String {
    if let Some(value) = secret.data.as_ref().and_then(|data| data.get(key)) {
        return String::from_utf8_lossy(&value.0).trim().to_string();
    }
    secret
        .string_data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

impl Route53Provider {
    pub fn new(api: Arc<dyn Route53Api>, zone_id_filter: ZoneIdFilter) -> Self {
        Self {
            api,
            zone_id_filter,
            health_check_reconciler: OnceLock::new(),
        }
    }

    /// Build a provider from an AWS credential secret and check it can reach Route53.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyCredentials`] when the key id or secret key is empty
    /// - [`DnsError::Provider`] when listing hosted zones fails
    pub async fn from_secret(secret: &Secret, config: &DNSProviderConfig) -> Result<Self, DnsError> {
        let access_key_id = secret_value(secret, AWS_ACCESS_KEY_ID_KEY);
        let secret_access_key = secret_value(secret, AWS_SECRET_ACCESS_KEY_KEY);
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(ValidationError::EmptyCredentials {
                secret: format!(
                    "{}/{}",
                    secret.namespace().unwrap_or_default(),
                    secret.name_any()
                ),
            }
            .into());
        }

        let region = match secret_value(secret, AWS_REGION_KEY) {
            r if r.is_empty() => DEFAULT_AWS_REGION.to_string(),
            r => r,
        };
        let api = SdkRoute53Api::new(&access_key_id, &secret_access_key, &region);
        let provider = Self::new(
            Arc::new(api),
            ZoneIdFilter::new(config.zone_id_filter.clone()),
        );

        provider.validate_service_endpoints().await?;
        info!(region = %region, "Route53 provider ready");
        Ok(provider)
    }

    /// Make sure the credentials can reach the Route53 API.
    async fn validate_service_endpoints(&self) -> Result<(), DnsError> {
        self.api.list_hosted_zones(None, Some(1)).await.map(|_| ())
    }

    /// Translate one endpoint into a Route53 change.
    ///
    /// # Errors
    ///
    /// Validation errors for unsupported record types, an empty name or no targets. No
    /// network call is made for an invalid endpoint.
    pub fn change_for_endpoint(
        endpoint: &Endpoint,
        action: ChangeAction,
    ) -> Result<Change, DnsError> {
        if RecordType::from_str(&endpoint.record_type).is_err() {
            return Err(ValidationError::UnsupportedRecordType {
                dns_name: endpoint.dns_name.clone(),
                record_type: endpoint.record_type.clone(),
            }
            .into());
        }
        if endpoint.dns_name.is_empty() {
            return Err(ValidationError::MissingDomain.into());
        }
        if endpoint.targets.is_empty() {
            return Err(ValidationError::MissingTargets {
                dns_name: endpoint.dns_name.clone(),
            }
            .into());
        }

        let mut record_set = ResourceRecordSet {
            name: endpoint.dns_name.clone(),
            record_type: endpoint.record_type.clone(),
            ttl: endpoint.record_ttl,
            values: endpoint.targets.clone(),
            ..Default::default()
        };

        if !endpoint.set_identifier.is_empty() {
            record_set.set_identifier = Some(endpoint.set_identifier.clone());
        }
        if let Some(value) = endpoint.provider_specific_property(PROVIDER_SPECIFIC_WEIGHT) {
            let weight = value.parse::<i64>().unwrap_or_else(|e| {
                warn!(
                    dns_name = %endpoint.dns_name,
                    value,
                    error = %e,
                    "Failed parsing weight, using weight of 0"
                );
                0
            });
            record_set.weight = Some(weight);
        }
        if let Some(value) = endpoint.provider_specific_property(PROVIDER_SPECIFIC_REGION) {
            record_set.region = Some(value.to_string());
        }
        if let Some(value) = endpoint.provider_specific_property(PROVIDER_SPECIFIC_FAILOVER) {
            record_set.failover = Some(value.to_string());
        }
        if endpoint
            .provider_specific_property(PROVIDER_SPECIFIC_MULTI_VALUE_ANSWER)
            .is_some()
        {
            record_set.multi_value_answer = Some(true);
        }
        record_set.geo_location = geo_location_for(endpoint);
        if let Some(value) = endpoint.provider_specific_property(PROVIDER_SPECIFIC_HEALTH_CHECK_ID) {
            record_set.health_check_id = Some(value.to_string());
        }

        Ok(Change { action, record_set })
    }

    /// Build the change batch for `record`.
    ///
    /// Published SetIDs missing from the spec are deleted first, for both actions, so a
    /// variant moving between SetIDs never collides with itself inside the batch.
    pub fn changes_for_record(
        record: &DNSRecord,
        action: ChangeAction,
    ) -> Result<Vec<Change>, DnsError> {
        let mut changes = Vec::new();

        let expected: HashSet<String> =
            record.spec.endpoints.iter().map(Endpoint::set_id).collect();
        let published = record
            .status
            .as_ref()
            .map(|status| status.endpoints.as_slice())
            .unwrap_or_default();
        for endpoint in published {
            if !expected.contains(&endpoint.set_id()) {
                changes.push(Self::change_for_endpoint(endpoint, ChangeAction::Delete)?);
            }
        }

        for endpoint in &record.spec.endpoints {
            changes.push(Self::change_for_endpoint(endpoint, action)?);
        }
        Ok(changes)
    }

    async fn change(&self, record: &DNSRecord, action: ChangeAction) -> Result<(), DnsError> {
        if action == ChangeAction::Upsert && record.spec.endpoints.is_empty() {
            debug!(record = %record.name_any(), "No endpoints, nothing to change");
            return Ok(());
        }

        let changes = Self::changes_for_record(record, action)?;
        if changes.is_empty() {
            debug!(record = %record.name_any(), "No published endpoints, nothing to change");
            return Ok(());
        }

        self.api
            .change_resource_record_sets(&record.spec.zone_id, &changes)
            .await?;
        for change in &changes {
            metrics::record_provider_change(change.action.as_str());
        }

        match action {
            ChangeAction::Upsert => info!(
                record = %record.name_any(),
                hosted_zone_id = %record.spec.zone_id,
                changes = changes.len(),
                "Upserted DNS record"
            ),
            ChangeAction::Delete => info!(
                record = %record.name_any(),
                hosted_zone_id = %record.spec.zone_id,
                changes = changes.len(),
                "Deleted DNS record"
            ),
        }
        Ok(())
    }
}

/// Resolve the geo properties of an endpoint into a Route53 geolocation.
///
/// A country-level `geo-code` (country or `*`) sets the country code, anything else the
/// continent code. The subdivision property only applies when no continent was set.
fn geo_location_for(endpoint: &Endpoint) -> Option<GeoLocation> {
    let mut geo = GeoLocation::default();
    let mut use_geolocation = false;

    if let Some(value) = endpoint.provider_specific_property(PROVIDER_SPECIFIC_GEO_CODE) {
        if GeoCode::parse(value).is_country_level() {
            geo.country_code = Some(value.to_string());
        } else {
            geo.continent_code = Some(value.to_string());
        }
        use_geolocation = true;
    }

    if geo.continent_code.is_none() {
        if let Some(value) =
            endpoint.provider_specific_property(PROVIDER_SPECIFIC_GEOLOCATION_SUBDIVISION_CODE)
        {
            geo.subdivision_code = Some(value.to_string());
            use_geolocation = true;
        }
    }

    use_geolocation.then_some(geo)
}

#[async_trait]
impl Provider for Route53Provider {
    async fn list_zones(&self) -> Result<ZoneList, DnsError> {
        let mut items = Vec::new();
        let mut marker = None;

        loop {
            let page = self.api.list_hosted_zones(marker, None).await?;
            for zone in page.zones {
                if !self.zone_id_filter.matches(&zone.id) {
                    continue;
                }
                debug!(zone_id = %zone.id, zone_name = %zone.name, "Considering zone");
                items.push(Zone::new(zone.id, remove_trailing_dot(&zone.name)));
            }
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(ZoneList { items })
    }

    async fn ensure(&self, record: &DNSRecord) -> Result<(), DnsError> {
        self.change(record, ChangeAction::Upsert).await
    }

    async fn delete(&self, record: &DNSRecord) -> Result<(), DnsError> {
        self.change(record, ChangeAction::Delete).await
    }

    fn health_check_reconciler(&self) -> Arc<dyn HealthCheckReconciler> {
        self.health_check_reconciler
            .get_or_init(|| {
                let route53: Arc<dyn HealthCheckReconciler> =
                    Arc::new(Route53HealthCheckReconciler::new(self.api.clone()));
                Arc::new(CachedHealthCheckReconciler::new(route53))
            })
            .clone()
    }

    fn provider_specific(&self) -> ProviderSpecificLabels {
        ProviderSpecificLabels {
            weight: PROVIDER_SPECIFIC_WEIGHT.to_string(),
            health_check_id: PROVIDER_SPECIFIC_HEALTH_CHECK_ID.to_string(),
        }
    }
}
