// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider abstraction.
//!
//! A [`Provider`] lists the zones visible to a credential and applies the endpoint set of a
//! [`DNSRecord`] to an authoritative DNS backend. Backends are a closed set selected by
//! [`factory::resolve_provider`]; Route53 is the reference implementation.
//!
//! # Modules
//!
//! - [`zone`] - Longest-suffix zone matching and the zone id allow-list
//! - [`target`] - Aggregation of per-cluster gateway addresses into endpoints
//! - [`health`] - Provider-side health checks for endpoint targets
//! - [`route53`] - AWS Route53 backend
//! - [`factory`] - Provider resolution from a `DNSProvider` resource

pub mod factory;
#[cfg(test)]
pub mod fake;
pub mod health;
pub mod route53;
pub mod target;
pub mod zone;

use crate::crd::DNSRecord;
use crate::dns_errors::DnsError;
use async_trait::async_trait;
use health::HealthCheckReconciler;
use std::sync::Arc;

pub use zone::{find_matching_zone, ZoneIdFilter};

/// A provider-managed DNS zone.
///
/// Produced by [`Provider::list_zones`] and never persisted; zones are re-fetched every pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Zone {
    /// Opaque provider id (Route53: `/hostedzone/Z...`)
    pub id: String,
    /// Domain name without a trailing dot
    pub dns_name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, dns_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dns_name: dns_name.into(),
        }
    }
}

/// Zones visible to one provider credential, already filtered by its zone id allow-list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneList {
    pub items: Vec<Zone>,
}

/// Wire-level endpoint property names a backend understands for routing metadata.
///
/// The target aggregator tags endpoints with these keys so it never hardcodes one
/// backend's vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSpecificLabels {
    /// Property carrying a routing weight
    pub weight: String,
    /// Property carrying a provider health check id
    pub health_check_id: String,
}

/// Capability interface implemented by every DNS backend.
///
/// # Idempotency
///
/// [`Provider::ensure`] replaces the complete endpoint set of a record: calling it twice
/// with the same record leaves the live provider state unchanged after the first call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// List all zones visible to the credential, filtered by the configured zone id allow-list.
    async fn list_zones(&self) -> Result<ZoneList, DnsError>;

    /// Make the live record sets match `record.spec.endpoints`, deleting any previously
    /// published endpoint (from `record.status.endpoints`) whose SetID left `spec.endpoints`.
    ///
    /// A record without endpoints is a no-op.
    async fn ensure(&self, record: &DNSRecord) -> Result<(), DnsError>;

    /// Delete every endpoint in `record.spec.endpoints`.
    async fn delete(&self, record: &DNSRecord) -> Result<(), DnsError>;

    /// Health check reconciler for this provider. Built on first use and cached for the
    /// lifetime of the provider instance.
    fn health_check_reconciler(&self) -> Arc<dyn HealthCheckReconciler>;

    /// Property names for weight and health check id on this backend.
    fn provider_specific(&self) -> ProviderSpecificLabels;
}

// ============================================================================
// Geo codes
// ============================================================================

/// Continent codes understood by geo-routing backends.
const CONTINENT_CODES: [&str; 7] = ["AF", "AN", "AS", "EU", "NA", "OC", "SA"];

/// Classification of a `geo-code` endpoint property value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeoCode<'a> {
    /// Matches every location no other variant covers (`*`)
    Wildcard,
    /// ISO 3166 alpha-2 country code
    Country(&'a str),
    /// Continent code
    Continent(&'a str),
}

impl<'a> GeoCode<'a> {
    /// Classify a geo code.
    ///
    /// Continent codes are checked first, so two-letter continent codes (`NA`, `EU`)
    /// never resolve to the country sharing those letters. Any other two-letter value is a
    /// country; everything else is treated as a continent.
    #[must_use]
    pub fn parse(value: &'a str) -> Self {
        if value == crate::constants::WILDCARD_GEO {
            GeoCode::Wildcard
        } else if CONTINENT_CODES.contains(&value) {
            GeoCode::Continent(value)
        } else if is_iso_alpha2_code(value) {
            GeoCode::Country(value)
        } else {
            GeoCode::Continent(value)
        }
    }

    /// True for the wildcard and for country codes, which backends store as a country.
    #[must_use]
    pub fn is_country_level(&self) -> bool {
        matches!(self, GeoCode::Wildcard | GeoCode::Country(_))
    }
}

/// True for a two-letter upper-case ASCII code.
#[must_use]
pub fn is_iso_alpha2_code(value: &str) -> bool {
    value.len() == 2 && value.bytes().all(|b| b.is_ascii_uppercase())
}

/// Strip one trailing dot from a hostname. IP literals are returned untouched.
#[must_use]
pub fn remove_trailing_dot(hostname: &str) -> &str {
    if hostname.parse::<std::net::IpAddr>().is_ok() {
        return hostname;
    }
    hostname.strip_suffix('.').unwrap_or(hostname)
}
