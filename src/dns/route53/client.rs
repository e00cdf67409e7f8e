// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route53 API surface used by the provider, and its AWS SDK implementation.
//!
//! The provider builds changes in the plain types below; [`SdkRoute53Api`] translates them
//! into `aws-sdk-route53` calls. Keeping the SDK behind [`Route53Api`] lets the change-set
//! logic run against an in-memory API in tests.

use crate::constants::ROUTE53_MAX_ATTEMPTS;
use crate::dns_errors::DnsError;
use async_trait::async_trait;
use aws_sdk_route53::config::retry::RetryConfig;
use aws_sdk_route53::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types;
use std::net::IpAddr;
use tracing::debug;

/// Route53 change action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    Upsert,
    Delete,
}

impl ChangeAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Upsert => "UPSERT",
            ChangeAction::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeoLocation {
    pub continent_code: Option<String>,
    pub country_code: Option<String>,
    pub subdivision_code: Option<String>,
}

/// One Route53 resource record set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceRecordSet {
    pub name: String,
    pub record_type: String,
    pub ttl: i64,
    pub values: Vec<String>,
    pub set_identifier: Option<String>,
    pub weight: Option<i64>,
    pub region: Option<String>,
    pub failover: Option<String>,
    pub multi_value_answer: Option<bool>,
    pub geo_location: Option<GeoLocation>,
    pub health_check_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub record_set: ResourceRecordSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedZone {
    pub id: String,
    pub name: String,
}

/// One page of `ListHostedZones`. `next_marker` is set while more pages remain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostedZonePage {
    pub zones: Vec<HostedZone>,
    pub next_marker: Option<String>,
}

/// Health check probing one gateway address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheckRequest {
    /// IP address or fully qualified domain name
    pub address: String,
    pub port: i32,
    pub resource_path: String,
    pub https: bool,
    pub failure_threshold: i32,
    pub request_interval: i32,
}

/// The Route53 operations the provider needs.
#[async_trait]
pub trait Route53Api: Send + Sync {
    async fn list_hosted_zones(
        &self,
        marker: Option<String>,
        max_items: Option<i32>,
    ) -> Result<HostedZonePage, DnsError>;

    /// Apply all changes atomically in one batch.
    async fn change_resource_record_sets(
        &self,
        zone_id: &str,
        changes: &[Change],
    ) -> Result<(), DnsError>;

    /// Create a health check. A caller reference can only ever be used once, even after the
    /// check it created was deleted.
    async fn create_health_check(
        &self,
        caller_reference: &str,
        request: &HealthCheckRequest,
    ) -> Result<String, DnsError>;

    /// Id of a live health check whose caller reference starts with `prefix`.
    async fn find_health_check(&self, prefix: &str) -> Result<Option<String>, DnsError>;

    /// Delete a health check. An unknown id is not an error.
    async fn delete_health_check(&self, id: &str) -> Result<(), DnsError>;
}

/// [`Route53Api`] backed by `aws-sdk-route53`.
pub struct SdkRoute53Api {
    client: aws_sdk_route53::Client,
}

impl SdkRoute53Api {
    /// Build a client with static credentials, the given region and standard retries.
    pub fn new(access_key_id: &str, secret_access_key: &str, region: &str) -> Self {
        let config = aws_sdk_route53::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "gatewaydns-secret",
            ))
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::standard().with_max_attempts(ROUTE53_MAX_ATTEMPTS))
            .build();
        Self {
            client: aws_sdk_route53::Client::from_conf(config),
        }
    }
}

fn sdk_error(operation: &str, err: impl std::error::Error) -> DnsError {
    DnsError::provider(operation, DisplayErrorContext(err).to_string())
}

fn to_sdk_change(change: &Change) -> Result<types::Change, aws_sdk_route53::error::BuildError> {
    let rs = &change.record_set;
    let records = rs
        .values
        .iter()
        .map(|value| types::ResourceRecord::builder().value(value).build())
        .collect::<Result<Vec<_>, _>>()?;
    let geo_location = rs.geo_location.as_ref().map(|geo| {
        types::GeoLocation::builder()
            .set_continent_code(geo.continent_code.clone())
            .set_country_code(geo.country_code.clone())
            .set_subdivision_code(geo.subdivision_code.clone())
            .build()
    });

    let record_set = types::ResourceRecordSet::builder()
        .name(&rs.name)
        .r#type(types::RrType::from(rs.record_type.as_str()))
        .ttl(rs.ttl)
        .set_resource_records(Some(records))
        .set_set_identifier(rs.set_identifier.clone())
        .set_weight(rs.weight)
        .set_region(rs.region.as_deref().map(types::ResourceRecordSetRegion::from))
        .set_failover(
            rs.failover
                .as_deref()
                .map(types::ResourceRecordSetFailover::from),
        )
        .set_multi_value_answer(rs.multi_value_answer)
        .set_geo_location(geo_location)
        .set_health_check_id(rs.health_check_id.clone())
        .build()?;

    let action = match change.action {
        ChangeAction::Upsert => types::ChangeAction::Upsert,
        ChangeAction::Delete => types::ChangeAction::Delete,
    };
    types::Change::builder()
        .action(action)
        .resource_record_set(record_set)
        .build()
}

#[async_trait]
impl Route53Api for SdkRoute53Api {
    async fn list_hosted_zones(
        &self,
        marker: Option<String>,
        max_items: Option<i32>,
    ) -> Result<HostedZonePage, DnsError> {
        let output = self
            .client
            .list_hosted_zones()
            .set_marker(marker)
            .set_max_items(max_items)
            .send()
            .await
            .map_err(|e| sdk_error("ListHostedZones", e))?;

        let zones = output
            .hosted_zones()
            .iter()
            .map(|zone| HostedZone {
                id: zone.id().to_string(),
                name: zone.name().to_string(),
            })
            .collect();
        let next_marker = if output.is_truncated() {
            output.next_marker().map(str::to_string)
        } else {
            None
        };
        Ok(HostedZonePage { zones, next_marker })
    }

    async fn change_resource_record_sets(
        &self,
        zone_id: &str,
        changes: &[Change],
    ) -> Result<(), DnsError> {
        let sdk_changes = changes
            .iter()
            .map(to_sdk_change)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sdk_error("ChangeResourceRecordSets", e))?;
        let batch = types::ChangeBatch::builder()
            .set_changes(Some(sdk_changes))
            .build()
            .map_err(|e| sdk_error("ChangeResourceRecordSets", e))?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| sdk_error("ChangeResourceRecordSets", e))?;
        debug!(zone_id, change_info = ?output.change_info(), "Route53 change submitted");
        Ok(())
    }

    async fn create_health_check(
        &self,
        caller_reference: &str,
        request: &HealthCheckRequest,
    ) -> Result<String, DnsError> {
        let check_type = if request.https {
            types::HealthCheckType::Https
        } else {
            types::HealthCheckType::Http
        };
        let builder = types::HealthCheckConfig::builder()
            .r#type(check_type)
            .port(request.port)
            .resource_path(&request.resource_path)
            .failure_threshold(request.failure_threshold)
            .request_interval(request.request_interval);
        let builder = if request.address.parse::<IpAddr>().is_ok() {
            builder.ip_address(&request.address)
        } else {
            builder.fully_qualified_domain_name(&request.address)
        };
        let config = builder
            .build()
            .map_err(|e| sdk_error("CreateHealthCheck", e))?;

        let output = self
            .client
            .create_health_check()
            .caller_reference(caller_reference)
            .health_check_config(config)
            .send()
            .await
            .map_err(|e| sdk_error("CreateHealthCheck", e))?;

        output
            .health_check()
            .map(|hc| hc.id().to_string())
            .ok_or_else(|| DnsError::provider("CreateHealthCheck", "response has no health check"))
    }

    async fn find_health_check(&self, prefix: &str) -> Result<Option<String>, DnsError> {
        let mut marker = None;
        loop {
            let output = self
                .client
                .list_health_checks()
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| sdk_error("ListHealthChecks", e))?;

            if let Some(hc) = output
                .health_checks()
                .iter()
                .find(|hc| hc.caller_reference().starts_with(prefix))
            {
                return Ok(Some(hc.id().to_string()));
            }
            match output.next_marker() {
                Some(next) if output.is_truncated() => marker = Some(next.to_string()),
                _ => return Ok(None),
            }
        }
    }

    async fn delete_health_check(&self, id: &str) -> Result<(), DnsError> {
        match self
            .client
            .delete_health_check()
            .health_check_id(id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_health_check()) =>
            {
                debug!(id, "Health check already gone");
                Ok(())
            }
            Err(err) => Err(sdk_error("DeleteHealthCheck", err)),
        }
    }
}
