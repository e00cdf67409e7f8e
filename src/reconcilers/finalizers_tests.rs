// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{DNSPolicy, DNSPolicySpec};
    use crate::labels::FINALIZER_DNS_POLICY;
    use crate::reconcilers::finalizers::has_finalizer;

    fn policy_with_finalizers(finalizers: Option<Vec<String>>) -> DNSPolicy {
        let mut policy = DNSPolicy::new("prod-web", DNSPolicySpec::default());
        policy.metadata.namespace = Some("gateways".to_string());
        policy.metadata.finalizers = finalizers;
        policy
    }

    #[test]
    fn test_has_finalizer_none() {
        assert!(!has_finalizer(
            &policy_with_finalizers(None),
            FINALIZER_DNS_POLICY
        ));
    }

    #[test]
    fn test_has_finalizer_present() {
        let policy = policy_with_finalizers(Some(vec![
            "other.io/finalizer".to_string(),
            FINALIZER_DNS_POLICY.to_string(),
        ]));
        assert!(has_finalizer(&policy, FINALIZER_DNS_POLICY));
    }

    #[test]
    fn test_has_finalizer_other_only() {
        let policy = policy_with_finalizers(Some(vec!["other.io/finalizer".to_string()]));
        assert!(!has_finalizer(&policy, FINALIZER_DNS_POLICY));
    }
}
