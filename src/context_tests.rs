// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for context.rs

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{DNSPolicySpec, GatewaySpec, PolicyTargetReference};
    use kube::runtime::reflector;
    use kube::runtime::watcher::Event;
    use std::collections::BTreeMap;

    fn gateway(name: &str, namespace: &str, annotation: Option<&str>) -> Gateway {
        let mut gw = Gateway::new(name, GatewaySpec::default());
        gw.metadata.namespace = Some(namespace.to_string());
        if let Some(value) = annotation {
            gw.metadata.annotations = Some(BTreeMap::from([(
                DNS_POLICY_ANNOTATION.to_string(),
                value.to_string(),
            )]));
        }
        gw
    }

    fn policy(target: &str) -> DNSPolicy {
        let mut policy = DNSPolicy::new(
            "prod-web",
            DNSPolicySpec {
                target_ref: PolicyTargetReference {
                    group: "gateway.networking.k8s.io".to_string(),
                    kind: "Gateway".to_string(),
                    name: target.to_string(),
                    namespace: None,
                },
                ..Default::default()
            },
        );
        policy.metadata.namespace = Some("gateways".to_string());
        policy
    }

    fn stores(gateways: Vec<Gateway>) -> Stores {
        let (policies, _) = reflector::store::<DNSPolicy>();
        let (reader, mut writer) = reflector::store::<Gateway>();
        for gw in gateways {
            writer.apply_watcher_event(&Event::Apply(gw));
        }
        Stores {
            dns_policies: policies,
            gateways: reader,
            namespace: None,
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.requeue_interval, Duration::from_secs(300));
        assert_eq!(settings.error_requeue, Duration::from_secs(30));
        assert_eq!(settings.reconcile_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_gateways_for_policy_includes_targeted_and_annotated() {
        let stores = stores(vec![
            gateway("prod-web", "gateways", None),
            gateway("old-web", "gateways", Some("gateways/prod-web")),
            gateway("other", "gateways", Some("gateways/other-policy")),
            gateway("prod-web", "elsewhere", None),
        ]);

        let names: Vec<String> = stores
            .gateways_for_policy(&policy("prod-web"))
            .iter()
            .map(|gw| format!("{}/{}", gw.namespace().unwrap_or_default(), gw.name_any()))
            .collect();

        assert_eq!(names, vec!["gateways/old-web", "gateways/prod-web"]);
    }

    #[test]
    fn test_gateway_keys_lists_every_gateway() {
        let stores = stores(vec![
            gateway("prod-web", "gateways", None),
            gateway("prod-web", "elsewhere", Some("gateways/prod-web")),
        ]);

        assert_eq!(
            stores.gateway_keys(),
            BTreeSet::from([
                "elsewhere/prod-web".to_string(),
                "gateways/prod-web".to_string(),
            ])
        );
    }
}
