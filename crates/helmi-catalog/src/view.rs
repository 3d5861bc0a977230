//! The `services` object exposed to credentials templates
//!
//! At bind time a template resolves container ports against the release's
//! cluster services, across the three service types: ClusterIP maps to the
//! cluster port, NodePort to the node port, and a LoadBalancer exposes the
//! original port unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::{from_args, Object};
use minijinja::{Error, ErrorKind, State, Value};

use helmi_kube::{ClusterService, Node, ServiceType};

use crate::cluster::cluster_address;

/// Port and address resolution over a release's services
#[derive(Debug)]
pub struct ServicesView {
    services: BTreeMap<String, ClusterService>,
    nodes: Vec<Node>,
}

impl ServicesView {
    pub fn new(services: BTreeMap<String, ClusterService>, nodes: Vec<Node>) -> Self {
        Self { services, nodes }
    }

    /// Resolve a container port against a named service
    pub fn port(&self, service_name: &str, port: i64) -> Option<i64> {
        self.services
            .get(service_name)
            .and_then(|svc| map_port(svc, port))
    }

    /// Resolve a container port against any service that maps it
    pub fn find_port(&self, port: i64) -> Option<i64> {
        self.services.values().find_map(|svc| map_port(svc, port))
    }

    /// The address a client should dial for a named service
    pub fn ip(&self, service_name: &str) -> String {
        let Some(svc) = self.services.get(service_name) else {
            return String::new();
        };

        match svc.service_type {
            ServiceType::ClusterIp => svc.cluster_ip.clone(),
            ServiceType::NodePort => cluster_address(&self.nodes),
            ServiceType::LoadBalancer => svc.external_ip.clone(),
            ServiceType::Other => String::new(),
        }
    }

    /// First dialable address across all services
    ///
    /// Preference order: LoadBalancer, then NodePort, then ClusterIP.
    pub fn find_ip(&self) -> String {
        for svc in self.services.values() {
            if svc.service_type == ServiceType::LoadBalancer {
                return svc.external_ip.clone();
            }
        }

        for svc in self.services.values() {
            if svc.service_type == ServiceType::NodePort {
                return cluster_address(&self.nodes);
            }
        }

        for svc in self.services.values() {
            if svc.service_type == ServiceType::ClusterIp {
                return svc.cluster_ip.clone();
            }
        }

        String::new()
    }

    /// `ip:port` for a named service, empty when either part is missing
    pub fn address(&self, service_name: &str, port: i64) -> String {
        let ip = self.ip(service_name);
        match self.port(service_name, port) {
            Some(mapped) if !ip.is_empty() => format!("{}:{}", ip, mapped),
            _ => String::new(),
        }
    }
}

fn map_port(svc: &ClusterService, port: i64) -> Option<i64> {
    match svc.service_type {
        ServiceType::ClusterIp => svc.cluster_ports.get(&port).copied(),
        ServiceType::NodePort => svc.node_ports.get(&port).copied(),
        // the load balancer forwards the original port
        ServiceType::LoadBalancer => svc.node_ports.contains_key(&port).then_some(port),
        ServiceType::Other => None,
    }
}

/// Ports render as bare integers so credential consumers receive typed
/// values; a miss renders as nothing.
fn port_value(port: Option<i64>) -> Value {
    match port {
        Some(port) => Value::from(port),
        None => Value::from(""),
    }
}

impl Object for ServicesView {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "port" => {
                let (name, port): (&str, i64) = from_args(args)?;
                Ok(port_value(self.port(name, port)))
            }
            "find_port" => {
                let (port,): (i64,) = from_args(args)?;
                Ok(port_value(self.find_port(port)))
            }
            "ip" => {
                let (name,): (&str,) = from_args(args)?;
                Ok(Value::from(self.ip(name)))
            }
            "find_ip" => {
                let _: () = from_args(args)?;
                Ok(Value::from(self.find_ip()))
            }
            "address" => {
                let (name, port): (&str, i64) = from_args(args)?;
                Ok(Value::from(self.address(name, port)))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("services has no method named {}", method),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_nodes, fixture_services};

    fn view() -> ServicesView {
        ServicesView::new(fixture_services(), fixture_nodes())
    }

    #[test]
    fn test_cluster_ip_address() {
        assert_eq!(view().address("test_service", 7070), "10.0.70.70:7070");
    }

    #[test]
    fn test_node_port_address_uses_cluster_address() {
        assert_eq!(view().address("node_service", 8080), "2.2.2.2:31008");
    }

    #[test]
    fn test_load_balancer_port_passthrough() {
        // the node port mapping exists, but the LB exposes the original
        let view = view();
        assert_eq!(view.port("lb_service", 9090), Some(9090));
        assert_eq!(view.address("lb_service", 9090), "3.3.3.3:9090");
    }

    #[test]
    fn test_unmapped_port_resolves_to_nothing() {
        let view = view();
        assert_eq!(view.port("test_service", 9999), None);
        assert_eq!(view.address("test_service", 9999), "");
    }

    #[test]
    fn test_find_port_scans_all_services() {
        assert_eq!(view().find_port(8080), Some(31008));
        assert_eq!(view().find_port(4242), None);
    }

    #[test]
    fn test_find_ip_prefers_load_balancer() {
        assert_eq!(view().find_ip(), "3.3.3.3");

        let mut services = fixture_services();
        services.remove("lb_service");
        let view = ServicesView::new(services, fixture_nodes());
        assert_eq!(view.find_ip(), "2.2.2.2");

        let mut services = fixture_services();
        services.remove("lb_service");
        services.remove("node_service");
        let view = ServicesView::new(services, fixture_nodes());
        assert_eq!(view.find_ip(), "10.0.70.70");
    }

    #[test]
    fn test_port_renders_as_integer() {
        let rendered = minijinja::render!(
            "port: {{ services.port(\"test_service\", 7070) }}",
            services => Value::from_object(view())
        );
        let parsed: serde_json::Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed["port"], serde_json::json!(7070));
    }

    #[test]
    fn test_missing_port_renders_empty() {
        let rendered = minijinja::render!(
            "port: {{ services.port(\"test_service\", 1234) }}",
            services => Value::from_object(view())
        );
        assert_eq!(rendered.trim(), "port:");
    }
}
