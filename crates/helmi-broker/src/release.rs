//! Release lifecycle
//!
//! The broker keeps no per-release state: an instance id maps
//! deterministically onto a release name, the chart engine owns everything
//! installed under that name, and every question about a release is
//! answered by asking the engine and the cluster again.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use helmi_catalog::{Catalog, EmbeddedMetadata, Plan, Service, ServiceDefinition, Values};
use helmi_helm::HelmClient;
use helmi_kube::{ClusterClient, Namespace};

use crate::config::Config;
use crate::error::{BrokerError, Result};
use crate::health;

const RELEASE_PREFIX: &str = "helmi";
const RELEASE_NAME_SUFFIX_LENGTH: usize = 14;

/// Derive the stable release name for an instance id
///
/// Idempotent: anything already carrying the prefix passes through, so a
/// derived name derives to itself.
pub fn release_name(instance_id: &str) -> String {
    if instance_id.starts_with(RELEASE_PREFIX) {
        return instance_id.to_string();
    }

    let normalized: String = instance_id
        .to_lowercase()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .take(RELEASE_NAME_SUFFIX_LENGTH)
        .collect();

    format!("{}{}", RELEASE_PREFIX, normalized)
}

/// Resolve the chart for a plan, the plan override winning
pub fn resolve_chart(service: &ServiceDefinition, plan: &Plan) -> Result<String> {
    if !plan.chart.is_empty() {
        return Ok(plan.chart.clone());
    }
    if !service.chart.is_empty() {
        return Ok(service.chart.clone());
    }

    Err(BrokerError::MissingChart)
}

/// Resolve the chart version; empty means "unversioned" and is forwarded
pub fn resolve_chart_version(service: &ServiceDefinition, plan: &Plan) -> String {
    if !plan.chart_version.is_empty() {
        return plan.chart_version.clone();
    }
    service.chart_version.clone()
}

/// Asynchronous view of a release for polling clients
#[derive(Debug, Clone, Default)]
pub struct Health {
    pub is_failed: bool,
    pub is_ready: bool,
    deployment_time: Option<DateTime<Utc>>,
}

impl Health {
    pub fn new(is_failed: bool, is_ready: bool, deployment_time: Option<DateTime<Utc>>) -> Self {
        Self {
            is_failed,
            is_ready,
            deployment_time,
        }
    }

    /// A release that is still not ready past the deadline counts as
    /// timed out; an unknown deployment time counts as expired.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        if self.is_ready {
            return false;
        }

        match self.deployment_time {
            Some(deployed) => match chrono::Duration::from_std(timeout) {
                Ok(timeout) => Utc::now() > deployed + timeout,
                Err(_) => false,
            },
            None => true,
        }
    }
}

/// OSBAPI last-operation states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::InProgress => "in progress",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed => "failed",
        }
    }
}

/// Map a health view onto the last-operation state
pub fn operation_state(health: &Health, timeout: Duration) -> OperationState {
    if health.is_failed || health.is_timed_out(timeout) {
        OperationState::Failed
    } else if health.is_ready {
        OperationState::Succeeded
    } else {
        OperationState::InProgress
    }
}

/// Orchestrates catalog, chart engine and cluster per release
pub struct ReleaseManager {
    catalog: Arc<Catalog>,
    helm: HelmClient,
    cluster: ClusterClient,
    config: Arc<Config>,
}

impl ReleaseManager {
    pub fn new(
        catalog: Arc<Catalog>,
        helm: HelmClient,
        cluster: ClusterClient,
        config: Arc<Config>,
    ) -> Self {
        Self {
            catalog,
            helm,
            cluster,
            config,
        }
    }

    fn service_and_plan(&self, service_id: &str, plan_id: &str) -> Result<(Service, Plan)> {
        let service = self
            .catalog
            .service(service_id)
            .ok_or_else(|| BrokerError::UnknownServicePlan(service_id.to_string()))?;
        let plan = service
            .plan(plan_id)
            .ok_or_else(|| BrokerError::UnknownServicePlan(plan_id.to_string()))?
            .clone();
        Ok((service, plan))
    }

    /// Install a new release for an instance
    pub async fn install(
        &self,
        service_id: &str,
        plan_id: &str,
        instance_id: &str,
        namespace: &Namespace,
        accepts_incomplete: bool,
        parameters: &JsonValue,
        context_values: &JsonValue,
    ) -> Result<()> {
        let name = release_name(instance_id);
        let (service, plan) = self.service_and_plan(service_id, plan_id)?;

        let chart = resolve_chart(&service.definition, &plan)?;
        let chart_version = resolve_chart_version(&service.definition, &plan);

        // the values template may derive a cluster address; an unreachable
        // node list degrades to empty rather than blocking the install
        let nodes = self.cluster.get_nodes().await.unwrap_or_default();
        let values = service.chart_values(
            &plan,
            &name,
            namespace,
            parameters,
            context_values,
            &nodes,
        )?;

        if let Err(err) = self
            .helm
            .install(
                &name,
                &chart,
                &chart_version,
                values.inner(),
                &namespace.name,
                accepts_incomplete,
            )
            .await
        {
            tracing::error!(
                instance_id,
                name,
                chart,
                chart_version,
                service_id,
                plan_id,
                namespace = namespace.name,
                error = %err,
                "failed to install release"
            );

            if let Ok(true) = self.helm.exists(&name).await {
                return Err(BrokerError::AlreadyExists);
            }
            return Err(err.into());
        }

        tracing::info!(
            instance_id,
            name,
            chart,
            chart_version,
            service_id,
            plan_id,
            namespace = namespace.name,
            "new release installed"
        );

        Ok(())
    }

    /// Delete the release of an instance
    pub async fn delete(&self, instance_id: &str) -> Result<()> {
        let name = release_name(instance_id);

        if let Err(err) = self.helm.delete(&name).await {
            if let Ok(false) = self.helm.exists(&name).await {
                tracing::info!(instance_id, name, "delete of a release that did not exist");
                return Err(BrokerError::ReleaseNotFound);
            }

            tracing::error!(instance_id, name, error = %err, "failed to delete release");
            return Err(err.into());
        }

        tracing::info!(instance_id, name, "release deleted");
        Ok(())
    }

    /// Check release existence
    pub async fn exists(&self, instance_id: &str) -> Result<bool> {
        Ok(self.helm.exists(&release_name(instance_id)).await?)
    }

    /// Render the dashboard URL for a freshly provisioned instance
    ///
    /// Best effort: a render problem is logged, not surfaced, because the
    /// install itself already succeeded.
    pub async fn dashboard_url(
        &self,
        service_id: &str,
        plan_id: &str,
        instance_id: &str,
        namespace: &Namespace,
        parameters: &JsonValue,
        context_values: &JsonValue,
    ) -> Option<String> {
        let name = release_name(instance_id);
        let (service, plan) = self.service_and_plan(service_id, plan_id).ok()?;
        let nodes = self.cluster.get_nodes().await.unwrap_or_default();

        match service.dashboard_url(&plan, &name, namespace, parameters, context_values, &nodes) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(instance_id, name, error = %err, "failed to render dashboard url");
                None
            }
        }
    }

    /// Compute the bound credentials of an available release
    pub async fn credentials(
        &self,
        service_id: &str,
        plan_id: &str,
        instance_id: &str,
    ) -> Result<Values> {
        let name = release_name(instance_id);
        let (service, plan) = self.service_and_plan(service_id, plan_id)?;

        let status = match self.helm.status(&name, &self.cluster).await {
            Ok(status) => status,
            Err(err) => {
                if let Ok(false) = self.helm.exists(&name).await {
                    tracing::info!(instance_id, name, "credentials asked for deleted release");
                    return Err(BrokerError::ReleaseNotFound);
                }
                tracing::error!(instance_id, name, error = %err, "failed to get release status");
                return Err(err.into());
            }
        };

        if !status.is_available() {
            return Err(BrokerError::NotReady);
        }

        let nodes = self.cluster.get_nodes().await?;
        let values = Values(self.helm.get_values(&name).await?);

        let section = service.release_section(
            &plan,
            &nodes,
            &status.name,
            &status.namespace,
            &status.services,
            &values,
            &self.config.ingress_domain,
        )?;

        tracing::debug!(instance_id, name, "sending release credentials");
        Ok(section.user_credentials)
    }

    /// Derive the health view of a release, running its declared probes
    /// once the engine reports it available
    pub async fn health(&self, instance_id: &str) -> Result<Health> {
        let name = release_name(instance_id);

        let status = match self.helm.status(&name, &self.cluster).await {
            Ok(status) => status,
            Err(err) => {
                if let Ok(false) = self.helm.exists(&name).await {
                    tracing::info!(instance_id, name, "status asked for deleted release");
                    return Err(BrokerError::ReleaseNotFound);
                }
                tracing::error!(instance_id, name, error = %err, "failed to get release status");
                return Err(err.into());
            }
        };

        let mut view = Health::new(status.is_failed, false, status.deployment_time);
        if !status.is_available() {
            return Ok(view);
        }

        let values = Values(self.helm.get_values(&name).await?);
        let metadata = EmbeddedMetadata::extract(values.inner(), &self.config.ingress_domain)?;

        let (service, plan) = self.service_and_plan(&metadata.service_id, &metadata.plan_id)?;
        let nodes = self.cluster.get_nodes().await?;

        let section = service.release_section(
            &plan,
            &nodes,
            &status.name,
            &status.namespace,
            &status.services,
            &values,
            &self.config.ingress_domain,
        )?;

        for url in &section.health_check_urls {
            if let Err(err) = health::check_health(url).await {
                tracing::info!(instance_id, name, url, error = %err, "health check failed");
                return Ok(view);
            }
        }

        view.is_ready = true;
        Ok(view)
    }
}
