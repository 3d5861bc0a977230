//! Cluster-level template variables
//!
//! Templates see the cluster as a single address, hostname and ingress
//! domain. The address prefers an operator-provided `DOMAIN`, then the
//! first externally reachable node, then any internal one.

use serde::Serialize;

use helmi_kube::Node;

/// The `cluster` object exposed to both catalog templates
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterVars {
    pub address: String,
    pub hostname: String,
    pub ingress_domain: String,
}

impl ClusterVars {
    pub fn derive(nodes: &[Node], ingress_domain: &str) -> Self {
        Self {
            address: cluster_address(nodes),
            hostname: cluster_hostname(nodes),
            ingress_domain: ingress_domain.to_string(),
        }
    }
}

/// Externally reachable cluster address
pub fn cluster_address(nodes: &[Node]) -> String {
    if let Ok(domain) = std::env::var("DOMAIN") {
        return domain;
    }

    for node in nodes {
        if !node.external_ip.is_empty() {
            return node.external_ip.clone();
        }
    }

    for node in nodes {
        if !node.internal_ip.is_empty() {
            return node.internal_ip.clone();
        }
    }

    String::new()
}

/// First reported node hostname
pub fn cluster_hostname(nodes: &[Node]) -> String {
    for node in nodes {
        if !node.hostname.is_empty() {
            return node.hostname.clone();
        }
    }

    String::new()
}
