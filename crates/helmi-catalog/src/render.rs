//! Rendering catalog templates against live state
//!
//! The two templates see strictly different worlds. The values template
//! renders at provision time against request parameters, platform context
//! and the target namespace; cluster-service details do not exist yet. The
//! credentials template renders at bind time against the release's stored
//! values and the observed cluster topology; request parameters only reach
//! it through those stored values.

use minijinja::{context, Value as TemplateValue};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use helmi_kube::{ClusterService, Namespace, Node};

use crate::cluster::ClusterVars;
use crate::error::{CatalogError, Result};
use crate::metadata::EmbeddedMetadata;
use crate::service::{Plan, Service};
use crate::values::Values;
use crate::view::ServicesView;

/// What the credentials template produces for a bound release
#[derive(Debug, Clone, Default)]
pub struct ReleaseSection {
    pub user_credentials: Values,
    pub health_check_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ValuesDocument {
    #[serde(default, rename = "chart-values")]
    chart_values: Option<serde_json::Map<String, JsonValue>>,
    #[serde(default, rename = "dashboard-url")]
    dashboard_url: Option<String>,
}

/// Requests leave parameters and context as null; templates want maps
fn or_empty(value: &JsonValue) -> JsonValue {
    if value.is_null() {
        JsonValue::Object(serde_json::Map::new())
    } else {
        value.clone()
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsDocument {
    #[serde(default, rename = "user-credentials")]
    user_credentials: Option<serde_json::Map<String, JsonValue>>,
    #[serde(default, rename = "health-checks")]
    health_checks: Option<Vec<String>>,
}

impl Service {
    /// Render the chart values for a new release
    ///
    /// The service-rendered map is overlaid with the plan's values, and the
    /// broker's metadata block goes on top where nothing can mask it.
    pub fn chart_values(
        &self,
        plan: &Plan,
        release_name: &str,
        namespace: &Namespace,
        parameters: &JsonValue,
        context_values: &JsonValue,
        nodes: &[Node],
    ) -> Result<Values> {
        let document = self.rendered_values_document(
            plan,
            release_name,
            namespace,
            parameters,
            context_values,
            nodes,
        )?;

        let mut values = Values::from(document.chart_values.unwrap_or_default());
        values.merge(&plan.chart_values);

        let metadata = EmbeddedMetadata {
            service_id: self.id().to_string(),
            plan_id: plan.id.clone(),
            ingress_domain: namespace.ingress_domain.clone(),
        };
        values.merge(&metadata.as_values());

        Ok(values)
    }

    /// Render the optional dashboard URL for a new release
    pub fn dashboard_url(
        &self,
        plan: &Plan,
        release_name: &str,
        namespace: &Namespace,
        parameters: &JsonValue,
        context_values: &JsonValue,
        nodes: &[Node],
    ) -> Result<Option<String>> {
        let document = self.rendered_values_document(
            plan,
            release_name,
            namespace,
            parameters,
            context_values,
            nodes,
        )?;
        Ok(document.dashboard_url)
    }

    /// Render credentials and health checks for an installed release
    pub fn release_section(
        &self,
        plan: &Plan,
        nodes: &[Node],
        release_name: &str,
        release_namespace: &str,
        services: &BTreeMap<String, ClusterService>,
        values: &Values,
        fallback_ingress_domain: &str,
    ) -> Result<ReleaseSection> {
        let metadata = EmbeddedMetadata::extract(values.inner(), fallback_ingress_domain)?;
        let cluster = ClusterVars::derive(nodes, &metadata.ingress_domain);
        let view = ServicesView::new(services.clone(), nodes.to_vec());

        let rendered = self.templates().render_credentials(context! {
            service => &self.definition,
            plan => plan,
            values => values,
            release => context! {
                name => release_name,
                namespace => release_namespace,
            },
            cluster => cluster,
            services => TemplateValue::from_object(view),
        })?;

        let document: CredentialsDocument =
            serde_yaml::from_str(&rendered).map_err(|source| CatalogError::RenderedDocument {
                section: "user-credentials",
                source,
            })?;

        let mut credentials = Values::from(document.user_credentials.unwrap_or_default());
        credentials.merge(&plan.user_credentials);

        Ok(ReleaseSection {
            user_credentials: credentials,
            health_check_urls: document.health_checks.unwrap_or_default(),
        })
    }

    fn rendered_values_document(
        &self,
        plan: &Plan,
        release_name: &str,
        namespace: &Namespace,
        parameters: &JsonValue,
        context_values: &JsonValue,
        nodes: &[Node],
    ) -> Result<ValuesDocument> {
        let cluster = ClusterVars::derive(nodes, &namespace.ingress_domain);

        let rendered = self.templates().render_values(context! {
            service => &self.definition,
            plan => plan,
            release => context! { name => release_name },
            parameters => or_empty(parameters),
            context => or_empty(context_values),
            cluster => cluster,
        })?;

        serde_yaml::from_str(&rendered).map_err(|source| CatalogError::RenderedDocument {
            section: "chart-values",
            source,
        })
    }
}
