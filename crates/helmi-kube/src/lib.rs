//! helmi-kube - read-only cluster projections
//!
//! The broker never writes to the cluster; the chart engine does. What the
//! broker needs from the Kubernetes API is a narrow, read-only view: node
//! addresses (to derive an externally reachable cluster address), namespaces
//! (with their annotation-sourced ingress domain), and services (type,
//! addresses and port maps, which the credentials templates resolve against).

pub mod client;
pub mod error;

pub use client::ClusterClient;
pub use error::{KubeError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace annotation carrying the ingress domain for provisioned services
pub const INGRESS_DOMAIN_ANNOTATION: &str = "monostream.com/helmi-svc-domain";

/// A cluster node, reduced to its addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub hostname: String,
    pub internal_ip: String,
    pub external_ip: String,
}

/// A namespace with its optional ingress domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub ingress_domain: String,
}

/// Kubernetes service types the credentials templates can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "ClusterIP")]
    ClusterIp,
    NodePort,
    LoadBalancer,
    /// Anything else (ExternalName, headless quirks); never resolvable
    Other,
}

impl ServiceType {
    fn parse(value: &str) -> Self {
        match value {
            "ClusterIP" => ServiceType::ClusterIp,
            "NodePort" => ServiceType::NodePort,
            "LoadBalancer" => ServiceType::LoadBalancer,
            _ => ServiceType::Other,
        }
    }
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::Other
    }
}

/// A cluster service with its port maps
///
/// `cluster_ports` maps container port to cluster port, `node_ports` maps
/// container port to node port. A port appears in exactly one of the two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterService {
    pub service_type: ServiceType,
    pub cluster_ip: String,
    pub external_ip: String,
    pub cluster_ports: BTreeMap<i64, i64>,
    pub node_ports: BTreeMap<i64, i64>,
}

impl ClusterService {
    /// True for a LoadBalancer that has not been assigned an external
    /// address yet
    pub fn is_pending_load_balancer(&self) -> bool {
        self.service_type == ServiceType::LoadBalancer && self.external_ip.is_empty()
    }
}
