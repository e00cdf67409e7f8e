// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pagination.rs`

#[cfg(test)]
mod tests {
    use crate::constants::KUBE_LIST_PAGE_SIZE;
    use kube::api::ListParams;

    #[test]
    fn test_pagination_constant() {
        assert_eq!(KUBE_LIST_PAGE_SIZE, 100);
    }

    #[test]
    fn test_label_selector_survives_page_limit() {
        let mut params = ListParams::default().labels("gatewaydns.io/gateway=prod-web");
        params.limit = Some(KUBE_LIST_PAGE_SIZE);

        assert_eq!(
            params.label_selector.as_deref(),
            Some("gatewaydns.io/gateway=prod-web")
        );
        assert_eq!(params.limit, Some(100));
    }
}
