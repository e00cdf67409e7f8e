// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// Fetches resources in pages of [`KUBE_LIST_PAGE_SIZE`], following the continue token
/// until the server reports no more pages.
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client, api::ListParams};
/// use gatewaydns::crd::DNSRecord;
/// use gatewaydns::reconcilers::pagination::list_all_paginated;
///
/// # async fn example() -> Result<(), kube::Error> {
/// let client = Client::try_default().await?;
/// let api: Api<DNSRecord> = Api::namespaced(client, "default");
///
/// let records = list_all_paginated(&api, ListParams::default().labels("gatewaydns.io/gateway=prod-web")).await?;
/// println!("Found {} records", records.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the Kubernetes API error of the first failing page.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
) -> Result<Vec<K>, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
            _ => break,
        }
    }

    Ok(all_items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
