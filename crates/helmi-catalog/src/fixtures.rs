//! Shared test fixtures: a small cluster topology used across modules

use std::collections::BTreeMap;

use helmi_kube::{ClusterService, Node, ServiceType};

pub(crate) fn fixture_services() -> BTreeMap<String, ClusterService> {
    let mut services = BTreeMap::new();
    services.insert(
        "test_service".to_string(),
        ClusterService {
            service_type: ServiceType::ClusterIp,
            cluster_ip: "10.0.70.70".into(),
            cluster_ports: BTreeMap::from([(7070, 7070)]),
            ..ClusterService::default()
        },
    );
    services.insert(
        "node_service".to_string(),
        ClusterService {
            service_type: ServiceType::NodePort,
            cluster_ip: "10.0.80.80".into(),
            node_ports: BTreeMap::from([(8080, 31008)]),
            ..ClusterService::default()
        },
    );
    services.insert(
        "lb_service".to_string(),
        ClusterService {
            service_type: ServiceType::LoadBalancer,
            external_ip: "3.3.3.3".into(),
            node_ports: BTreeMap::from([(9090, 31009)]),
            ..ClusterService::default()
        },
    );
    services
}

pub(crate) fn fixture_nodes() -> Vec<Node> {
    vec![Node {
        name: "test_node".into(),
        hostname: "test_hostname".into(),
        internal_ip: "1.1.1.1".into(),
        external_ip: "2.2.2.2".into(),
    }]
}
