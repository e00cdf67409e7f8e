// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{DNSPolicy, DNSPolicySpec, DNSPolicyStatus};
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, update_condition_in_memory,
        DNSPolicyStatusUpdater,
    };

    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    fn policy_with_status(status: Option<DNSPolicyStatus>) -> DNSPolicy {
        let mut policy = DNSPolicy::new("prod-web", DNSPolicySpec::default());
        policy.metadata.namespace = Some("gateways".to_string());
        policy.metadata.generation = Some(3);
        policy.status = status;
        policy
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition("Ready", STATUS_TRUE, "ReconcileSucceeded", "ok");

        assert_eq!(condition.r#type, "Ready");
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason.as_deref(), Some("ReconcileSucceeded"));
        assert_eq!(condition.message.as_deref(), Some("ok"));
        assert!(condition.last_transition_time.unwrap().contains('T'));
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![
            create_condition("Ready", STATUS_TRUE, "Ready", ""),
            create_condition("Degraded", STATUS_FALSE, "Healthy", ""),
        ];

        assert_eq!(
            find_condition(&conditions, "Degraded").map(|c| c.status.as_str()),
            Some(STATUS_FALSE)
        );
        assert!(find_condition(&conditions, "Progressing").is_none());
    }

    #[test]
    fn test_update_condition_preserves_transition_time_when_status_unchanged() {
        let mut original = create_condition("Ready", STATUS_TRUE, "Ready", "first");
        original.last_transition_time = Some("2025-01-01T00:00:00+00:00".to_string());
        let mut conditions = vec![original];

        update_condition_in_memory(&mut conditions, "Ready", STATUS_TRUE, "Ready", "second");

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message.as_deref(), Some("second"));
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_update_condition_bumps_transition_time_on_flip() {
        let mut original = create_condition("Ready", STATUS_TRUE, "Ready", "ok");
        original.last_transition_time = Some("2025-01-01T00:00:00+00:00".to_string());
        let mut conditions = vec![original];

        update_condition_in_memory(&mut conditions, "Ready", STATUS_FALSE, "ProviderError", "x");

        assert_eq!(conditions[0].status, STATUS_FALSE);
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let mut a = create_condition("Ready", STATUS_TRUE, "Ready", "ok");
        a.last_transition_time = Some("2025-01-01T00:00:00+00:00".to_string());
        let b = create_condition("Ready", STATUS_TRUE, "Ready", "ok");

        assert!(conditions_equal(&[a.clone()], &[b]));
        assert!(!conditions_equal(
            &[a],
            &[create_condition("Ready", STATUS_FALSE, "Ready", "ok")]
        ));
    }

    #[test]
    fn test_updater_first_status_has_changes() {
        let mut updater = DNSPolicyStatusUpdater::new(&policy_with_status(None));
        updater.set_condition("Ready", STATUS_TRUE, "ReconcileSucceeded", "ok");

        assert!(updater.has_changes());
        assert_eq!(updater.conditions().len(), 1);
    }

    #[test]
    fn test_updater_unchanged_status_skips_update() {
        let status = DNSPolicyStatus {
            conditions: vec![create_condition("Ready", STATUS_TRUE, "ReconcileSucceeded", "ok")],
            observed_generation: Some(3),
        };
        let mut updater = DNSPolicyStatusUpdater::new(&policy_with_status(Some(status)));
        updater.set_condition("Ready", STATUS_TRUE, "ReconcileSucceeded", "ok");
        updater.set_observed_generation(Some(3));

        assert!(!updater.has_changes());

        updater.set_observed_generation(Some(4));
        assert!(updater.has_changes());
    }
}
