//! Catalog entities and the definition file parser
//!
//! A definition file holds three `\n---` separated documents: the service
//! descriptor (plain YAML), the values template and the credentials
//! template. The descriptor decodes verbatim; the templates compile once
//! into the service's [`TemplatePair`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use helmi_engine::TemplatePair;

use crate::error::{CatalogError, Result};
use crate::values::Values;

/// Active catalog snapshot: service id to service
pub type ServiceMap = HashMap<String, Service>;

/// A service offering with its compiled templates
#[derive(Debug, Clone)]
pub struct Service {
    pub definition: ServiceDefinition,
    templates: Arc<TemplatePair>,
}

impl Service {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Find a plan by id, case-insensitively
    pub fn plan(&self, plan_id: &str) -> Option<&Plan> {
        self.definition
            .plans
            .iter()
            .find(|plan| plan.id.eq_ignore_ascii_case(plan_id))
    }

    pub(crate) fn templates(&self) -> &TemplatePair {
        &self.templates
    }
}

/// The service descriptor document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDefinition {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub chart: String,
    #[serde(default, rename = "chart-version")]
    pub chart_version: String,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

/// A pre-configured variant of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub chart: String,
    #[serde(default, rename = "chart-version")]
    pub chart_version: String,
    /// Plan-specific defaults merged over the service-rendered values
    #[serde(default, rename = "chart-values")]
    pub chart_values: Values,
    /// Plan-specific credential overlay
    #[serde(default, rename = "user-credentials")]
    pub user_credentials: Values,
    #[serde(default)]
    pub schemas: Option<Schemas>,
}

/// OSBAPI JSON schemas a plan may declare for its parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schemas {
    #[serde(
        default,
        rename(deserialize = "service-instance", serialize = "service_instance"),
        skip_serializing_if = "Option::is_none"
    )]
    pub service_instance: Option<InstanceSchemas>,
    #[serde(
        default,
        rename(deserialize = "service-binding", serialize = "service_binding"),
        skip_serializing_if = "Option::is_none"
    )]
    pub service_binding: Option<BindingSchemas>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSchemas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<SchemaParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<SchemaParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSchemas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<SchemaParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ServiceDocument {
    service: ServiceDefinition,
}

/// Parse one definition file into the service map
///
/// The first service wins nothing: a repeated id overwrites the earlier
/// entry, with a warning naming the file.
pub(crate) fn add_service_definition(
    services: &mut ServiceMap,
    input: &str,
    origin: &str,
) -> Result<()> {
    let documents: Vec<&str> = input.split("\n---").collect();
    if documents.len() != 3 {
        return Err(CatalogError::DocumentCount {
            file: origin.to_string(),
            found: documents.len(),
        });
    }

    let document: ServiceDocument =
        serde_yaml::from_str(documents[0]).map_err(|source| CatalogError::Definition {
            file: origin.to_string(),
            source,
        })?;

    let templates = Arc::new(TemplatePair::compile(documents[1], documents[2])?);

    let service = Service {
        definition: document.service,
        templates,
    };

    if services.contains_key(service.id()) {
        tracing::warn!(
            service_id = service.id(),
            file = origin,
            "duplicate service id in catalog, overwriting earlier definition"
        );
    }

    services.insert(service.id().to_string(), service);
    Ok(())
}

#[cfg(test)]
pub(crate) const TEST_DEFINITION: &str = r#"---
service:
  _id: "12345"
  _name: "test_service"
  description: "service_description"
  tags:
  - mysql
  - database
  metadata:
    somekey: somevalue
  chart: service_chart
  chart-version: 1.2.3
  plans:
  - _id: "67890"
    _name: test_plan
    description: "plan_description"
    metadata:
      someplankey: someplanvalue
    schemas:
      service-instance:
        create:
          parameters:
            $schema: http://json-schema.org/draft-04/schema#
            type: object
            properties:
              billing-account:
                description: Billing account number.
                type: string
      service-binding:
        create:
          parameters:
            $schema: http://json-schema.org/draft-04/schema#
            type: object
    chart: "plan_chart"
    chart-version: "4.5.6"
    chart-values:
      baz: qux
      nested:
        from_plan: "from plan"
---
chart-values:
  foo: "bar"
  username: "{{ generate_username() }}"
  password: "{{ generate_password() }}"
  hostname: "{{ cluster.ingress_domain }}"
  nested:
    from_vals: "from vals"
dashboard-url: "{{ cluster.ingress_domain }}/dashboard"
---
user-credentials:
  key: "{{ values.foo }}"
  plan_key: "{{ values.baz }}"
  cluster_addr: "{{ cluster.address }}"
  cluster_hostname: "{{ cluster.hostname }}"
  port: {{ services.port("test_service", 7070) }}
  node_port: {{ services.port("node_service", 8080) }}
  lb_port: {{ services.port("lb_service", 9090) }}
  any_port: {{ services.find_port(8080) }}
  addr: "{{ services.address("test_service", 7070) }}"
  lb_addr: "{{ services.address("lb_service", 9090) }}"
  node_addr: "{{ services.address("node_service", 8080) }}"
  namespace: "{{ release.namespace }}"
  nested:
{{ values.nested | toyaml | indent(4) }}
health-checks:
- "tcp://{{ services.address("test_service", 7070) }}"
"#;
