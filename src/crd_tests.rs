#[cfg(test)]
mod tests {
    use crate::crd::*;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    #[test]
    fn test_label_selector_default() {
        let selector = LabelSelector::default();
        assert!(selector.match_labels.is_none());
        assert!(selector.match_expressions.is_none());
    }

    #[test]
    fn test_record_type_from_str() {
        assert_eq!(RecordType::from_str("A").unwrap(), RecordType::A);
        assert_eq!(RecordType::from_str("CNAME").unwrap(), RecordType::CNAME);
        assert_eq!(RecordType::from_str("NS").unwrap(), RecordType::NS);
        assert_eq!(RecordType::from_str("AAAA").unwrap_err(), "AAAA");
        assert_eq!(RecordType::CNAME.to_string(), "CNAME");
    }

    #[test]
    fn test_endpoint_set_id_includes_set_identifier() {
        let mut ep = Endpoint::new(
            "api.example.com",
            RecordType::A,
            vec!["192.0.2.1".into()],
            60,
        );
        assert_eq!(ep.set_id(), "api.example.com/A/");

        ep.set_identifier = "cluster-1".into();
        assert_eq!(ep.set_id(), "api.example.com/A/cluster-1");
    }

    #[test]
    fn test_endpoint_provider_specific_properties() {
        let mut ep = Endpoint::new("api.example.com", RecordType::A, vec![], 60);
        assert!(ep.provider_specific_property("weight").is_none());

        ep.set_provider_specific_property("weight", "120");
        assert_eq!(ep.provider_specific_property("weight"), Some("120"));

        ep.set_provider_specific_property("weight", "10");
        assert_eq!(ep.provider_specific_property("weight"), Some("10"));
        assert_eq!(ep.provider_specific.len(), 1);
    }

    #[test]
    fn test_endpoint_serialization_field_names() {
        let mut ep = Endpoint::new(
            "api.example.com",
            RecordType::A,
            vec!["192.0.2.1".into()],
            60,
        );
        ep.set_identifier = "c1".into();
        ep.set_provider_specific_property("weight", "120");

        let json = serde_json::to_value(&ep).unwrap();
        assert_eq!(json["dnsName"], "api.example.com");
        assert_eq!(json["recordType"], "A");
        assert_eq!(json["recordTTL"], 60);
        assert_eq!(json["setIdentifier"], "c1");
        assert_eq!(json["providerSpecific"]["weight"], "120");
    }

    #[test]
    fn test_endpoint_deserialize_defaults() {
        let ep: Endpoint = serde_json::from_str(
            r#"{"dnsName":"api.example.com","recordType":"CNAME","targets":["lb.example.net"]}"#,
        )
        .unwrap();
        assert_eq!(ep.record_ttl, 60);
        assert!(ep.set_identifier.is_empty());
        assert!(ep.provider_specific.is_empty());
    }

    #[test]
    fn test_dns_record_spec_zone_id_field_name() {
        let spec = DNSRecordSpec {
            zone_id: "/hostedzone/Z1".into(),
            endpoints: vec![],
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["zoneID"], "/hostedzone/Z1");
    }

    #[test]
    fn test_dns_policy_spec_from_yaml() {
        let yaml = r#"
targetRef:
  group: gateway.networking.k8s.io
  kind: Gateway
  name: prod-web
providerRef:
  name: aws-credentials
loadBalancing:
  weighted:
    custom:
      - selector:
          matchLabels:
            tier: canary
        weight: 10
  geo:
    defaultGeo: EU
healthCheck:
  endpoint: /healthz
  protocol: HTTPS
"#;
        let spec: DNSPolicySpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.target_ref.name, "prod-web");
        assert!(spec.target_ref.namespace.is_none());

        let lb = spec.load_balancing.unwrap();
        let weighted = lb.weighted.unwrap();
        assert_eq!(weighted.default_weight, 120);
        assert_eq!(weighted.custom.len(), 1);
        assert_eq!(weighted.custom[0].weight, 10);
        assert_eq!(lb.geo.unwrap().default_geo, "EU");

        let hc = spec.health_check.unwrap();
        assert_eq!(hc.endpoint, "/healthz");
        assert_eq!(hc.protocol, HealthProtocol::Https);
        assert!(hc.port.is_none());
    }

    #[test]
    fn test_dns_provider_spec_from_yaml() {
        let yaml = r#"
credentials:
  name: aws-route53-secret
  providerType: aws
config:
  zoneIDFilter: ["Z1", "Z2"]
"#;
        let spec: DNSProviderSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.credentials.provider_type, "aws");
        assert_eq!(spec.config.zone_id_filter, vec!["Z1", "Z2"]);
    }

    #[test]
    fn test_dns_provider_config_defaults_empty() {
        let yaml = r#"
credentials:
  name: s
  providerType: AWS
"#;
        let spec: DNSProviderSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.config.zone_id_filter.is_empty());
    }

    #[test]
    fn test_gateway_listener_hostname_optional() {
        let yaml = r#"
gatewayClassName: multi-cluster
listeners:
  - name: api
    hostname: api.example.com
    port: 443
    protocol: HTTPS
  - name: catch-all
    port: 80
    protocol: HTTP
"#;
        let spec: GatewaySpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.listeners.len(), 2);
        assert_eq!(spec.listeners[0].hostname.as_deref(), Some("api.example.com"));
        assert!(spec.listeners[1].hostname.is_none());
    }

    #[test]
    fn test_condition_serialization_skips_empty() {
        let cond = Condition {
            r#type: "Ready".into(),
            status: "True".into(),
            reason: None,
            message: None,
            last_transition_time: None,
        };
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "Ready");
        assert!(json.get("reason").is_none());

        let mut labels = BTreeMap::new();
        labels.insert("k".to_string(), "v".to_string());
        let selector = LabelSelector {
            match_labels: Some(labels),
            match_expressions: None,
        };
        let json = serde_json::to_value(&selector).unwrap();
        assert_eq!(json["matchLabels"]["k"], "v");
    }
}
