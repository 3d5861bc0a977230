//! Kubernetes API access
//!
//! One client is created at startup from the inferred configuration
//! (kubeconfig when present, in-cluster service account otherwise) and
//! shared across requests.

use k8s_openapi::api::core::v1 as corev1;
use kube::api::{Api, ListParams};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::{ClusterService, Namespace, Node, ServiceType, INGRESS_DOMAIN_ANNOTATION};

/// Read-only cluster client
#[derive(Clone)]
pub struct ClusterClient {
    client: kube::Client,
}

impl ClusterClient {
    /// Connect using the inferred configuration
    pub async fn connect() -> Result<Self> {
        let client = kube::Client::try_default().await?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: kube::Client) -> Self {
        Self { client }
    }

    /// List all nodes with their addresses
    pub async fn get_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<corev1::Node> = Api::all(self.client.clone());
        let items = api.list(&ListParams::default()).await?;
        Ok(items.into_iter().map(node_from_api).collect())
    }

    /// Look up a namespace by name
    pub async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        let api: Api<corev1::Namespace> = Api::all(self.client.clone());
        let item = api.get(name).await?;
        Ok(namespace_from_api(item))
    }

    /// List namespaces matching a label selector
    pub async fn get_namespaces(&self, selector: &BTreeMap<String, String>) -> Result<Vec<Namespace>> {
        let labels = selector
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");

        let api: Api<corev1::Namespace> = Api::all(self.client.clone());
        let items = api.list(&ListParams::default().labels(&labels)).await?;
        Ok(items.into_iter().map(namespace_from_api).collect())
    }

    /// Fetch a service and project its addresses and port maps
    pub async fn get_service(&self, name: &str, namespace: &str) -> Result<ClusterService> {
        let api: Api<corev1::Service> = Api::namespaced(self.client.clone(), namespace);
        let item = api.get(name).await?;
        Ok(service_from_api(item))
    }
}

fn node_from_api(item: corev1::Node) -> Node {
    let mut node = Node {
        name: item.metadata.name.unwrap_or_default(),
        ..Node::default()
    };

    let addresses = item
        .status
        .and_then(|status| status.addresses)
        .unwrap_or_default();

    for address in addresses {
        match address.type_.as_str() {
            "Hostname" => node.hostname = address.address,
            "InternalIP" => node.internal_ip = address.address,
            "ExternalIP" => node.external_ip = address.address,
            _ => {}
        }
    }

    node
}

fn namespace_from_api(item: corev1::Namespace) -> Namespace {
    let ingress_domain = item
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(INGRESS_DOMAIN_ANNOTATION))
        .cloned()
        .unwrap_or_default();

    Namespace {
        name: item.metadata.name.unwrap_or_default(),
        ingress_domain,
    }
}

fn service_from_api(item: corev1::Service) -> ClusterService {
    let mut service = ClusterService::default();

    if let Some(spec) = item.spec {
        service.service_type = spec
            .type_
            .as_deref()
            .map(ServiceType::parse)
            .unwrap_or_default();

        // "None" marks a headless service
        if let Some(cluster_ip) = spec.cluster_ip {
            if cluster_ip != "None" {
                service.cluster_ip = cluster_ip;
            }
        }

        for port in spec.ports.unwrap_or_default() {
            match port.node_port {
                Some(node_port) if node_port != 0 => {
                    service.node_ports.insert(port.port as i64, node_port as i64);
                }
                _ => {
                    service.cluster_ports.insert(port.port as i64, port.port as i64);
                }
            }
        }
    }

    let ingress = item
        .status
        .and_then(|status| status.load_balancer)
        .and_then(|lb| lb.ingress)
        .unwrap_or_default();

    for entry in ingress {
        match entry.hostname {
            Some(hostname) if !hostname.is_empty() => service.external_ip = hostname,
            _ => {
                if let Some(ip) = entry.ip {
                    service.external_ip = ip;
                }
            }
        }
    }

    service
}
