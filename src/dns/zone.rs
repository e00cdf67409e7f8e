// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone matching for listener hostnames and the zone id allow-list.

use super::{remove_trailing_dot, Zone, ZoneList};
use crate::dns_errors::{DnsError, ZoneError};

/// Find the most specific zone containing `candidate_host`.
///
/// Among all zones whose name is a dot-bounded suffix of `candidate_host`, the one with
/// the longest name wins. The returned subdomain is the label prefix of `host` left after
/// stripping the matched zone name and the separating dot.
///
/// Matching is case-insensitive and ignores trailing dots. A host equal to a zone name
/// (the zone apex) does not match that zone.
///
/// # Errors
///
/// Returns [`ZoneError::NoMatchingZone`] when no zone contains the candidate.
///
/// # Example
///
/// ```rust
/// use gatewaydns::dns::{find_matching_zone, Zone, ZoneList};
///
/// let zones = ZoneList {
///     items: vec![
///         Zone::new("Z1", "example.com"),
///         Zone::new("Z2", "foo.example.com"),
///     ],
/// };
/// let (zone, sub) = find_matching_zone("bar.foo.example.com", "bar.foo.example.com", &zones).unwrap();
/// assert_eq!(zone.id, "Z2");
/// assert_eq!(sub, "bar");
/// ```
pub fn find_matching_zone(
    host: &str,
    candidate_host: &str,
    zones: &ZoneList,
) -> Result<(Zone, String), DnsError> {
    let candidate = remove_trailing_dot(candidate_host).to_ascii_lowercase();

    let best = zones
        .items
        .iter()
        .filter(|zone| {
            let name = remove_trailing_dot(&zone.dns_name).to_ascii_lowercase();
            !name.is_empty()
                && candidate.len() > name.len()
                && candidate.ends_with(&name)
                && candidate.as_bytes()[candidate.len() - name.len() - 1] == b'.'
        })
        .max_by_key(|zone| remove_trailing_dot(&zone.dns_name).len());

    let Some(zone) = best else {
        return Err(ZoneError::NoMatchingZone {
            host: host.to_string(),
        }
        .into());
    };

    let zone_name = remove_trailing_dot(&zone.dns_name);
    let host = remove_trailing_dot(host);
    let split = host
        .len()
        .checked_sub(zone_name.len())
        .and_then(|i| host.get(i..).map(|suffix| (i, suffix)));
    let sub_domain = match split {
        Some((i, suffix)) if i > 0 && suffix.eq_ignore_ascii_case(zone_name) => {
            host[..i].trim_end_matches('.').to_string()
        }
        _ => host.to_string(),
    };

    Ok((zone.clone(), sub_domain))
}

/// Allow-list of provider zone ids.
///
/// A zone id passes when it ends with any configured id, so both `Z0411` and
/// `/hostedzone/Z0411` select the same Route53 zone. An empty filter passes everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneIdFilter {
    zone_ids: Vec<String>,
}

impl ZoneIdFilter {
    pub fn new(zone_ids: Vec<String>) -> Self {
        Self { zone_ids }
    }

    /// Returns true if `zone_id` passes the filter.
    #[must_use]
    pub fn matches(&self, zone_id: &str) -> bool {
        self.zone_ids.is_empty() || self.zone_ids.iter().any(|id| zone_id.ends_with(id.as_str()))
    }

    /// Returns true if at least one non-empty id is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        match self.zone_ids.as_slice() {
            [] => false,
            [only] => !only.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
