//! OSBAPI documents and wire types
//!
//! Catalog entities project onto the service/plan documents platforms
//! consume. Everything here is bindable and free; plans are never
//! updatable. Absent metadata is passed through as null rather than being
//! dropped, matching what the platforms expect.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use helmi_catalog::{Schemas, ServiceMap};

/// `GET /v2/catalog` response
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub services: Vec<ServiceOffering>,
}

#[derive(Debug, Serialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub plan_updateable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub metadata: Option<JsonValue>,
    pub plans: Vec<ServicePlan>,
}

#[derive(Debug, Serialize)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub free: bool,
    pub bindable: bool,
    pub metadata: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Schemas>,
}

/// Project the active catalog snapshot onto OSBAPI documents
pub fn catalog_document(services: &ServiceMap) -> CatalogResponse {
    let mut offerings: Vec<ServiceOffering> = services
        .values()
        .map(|service| {
            let definition = &service.definition;

            let plans = definition
                .plans
                .iter()
                .map(|plan| ServicePlan {
                    id: plan.id.clone(),
                    name: plan.name.clone(),
                    description: plan.description.clone(),
                    free: true,
                    bindable: true,
                    metadata: plan.metadata.clone(),
                    schemas: plan.schemas.clone(),
                })
                .collect();

            ServiceOffering {
                id: definition.id.clone(),
                name: definition.name.clone(),
                description: definition.description.clone(),
                bindable: true,
                plan_updateable: false,
                tags: definition.tags.clone(),
                metadata: definition.metadata.clone(),
                plans,
            }
        })
        .collect();

    // snapshot maps are unordered; emit a stable document
    offerings.sort_by(|a, b| a.id.cmp(&b.id));

    CatalogResponse {
        services: offerings,
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub context: JsonValue,
    #[serde(default)]
    pub parameters: JsonValue,
    #[serde(default)]
    pub organization_guid: String,
    #[serde(default)]
    pub space_guid: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ProvisionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BindRequest {
    pub service_id: String,
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
pub struct BindResponse {
    pub credentials: JsonValue,
}

#[derive(Debug, Serialize)]
pub struct LastOperationResponse {
    pub state: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// Query parameters shared by the instance endpoints
#[derive(Debug, Default, Deserialize)]
pub struct InstanceQuery {
    #[serde(default)]
    pub accepts_incomplete: bool,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// OSBAPI error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub description: String,
}

impl ErrorResponse {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            error: None,
            description: description.into(),
        }
    }

    pub fn coded(error: &'static str, description: impl Into<String>) -> Self {
        Self {
            error: Some(error),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmi_catalog::Catalog;

    const DEFINITION: &str = r#"---
service:
  _id: "486e8c4b"
  _name: "postgresql"
  description: "dedicated postgresql"
  tags:
  - postgresql
  - database
  metadata:
    displayName: PostgreSQL
  chart: stable/postgresql
  plans:
  - _id: "f1b10f98"
    _name: standalone
    description: "single instance"
    metadata:
      bullets:
      - 1Gi storage
---
chart-values: {}
---
user-credentials: {}
"#;

    #[test]
    fn test_catalog_document_projection() {
        let catalog = Catalog::from_definition(DEFINITION).unwrap();
        let document = catalog_document(&catalog.services());

        assert_eq!(document.services.len(), 1);
        let offering = &document.services[0];
        assert_eq!(offering.id, "486e8c4b");
        assert_eq!(offering.name, "postgresql");
        assert!(offering.bindable);
        assert!(!offering.plan_updateable);
        assert_eq!(offering.tags, vec!["postgresql", "database"]);

        let plan = &offering.plans[0];
        assert_eq!(plan.id, "f1b10f98");
        assert!(plan.free);
        assert!(plan.bindable);
        assert!(plan.metadata.is_some());
        assert!(plan.schemas.is_none());
    }

    #[test]
    fn test_absent_metadata_serializes_as_null() {
        let definition = "---\nservice:\n  _id: bare\n  _name: bare\n  plans:\n  - _id: p\n    _name: p\n---\nc: 1\n---\nu: 1\n";
        let catalog = Catalog::from_definition(definition).unwrap();
        let document = catalog_document(&catalog.services());

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["services"][0]["metadata"], serde_json::Value::Null);
        assert_eq!(json["services"][0]["plans"][0]["metadata"], serde_json::Value::Null);
        // empty tags are dropped, absent schemas are dropped
        assert!(json["services"][0].get("tags").is_none());
        assert!(json["services"][0]["plans"][0].get("schemas").is_none());
    }

    #[test]
    fn test_error_response_shapes() {
        let plain = serde_json::to_value(ErrorResponse::new("boom")).unwrap();
        assert_eq!(plain, serde_json::json!({"description": "boom"}));

        let coded = serde_json::to_value(ErrorResponse::coded("AsyncRequired", "nope")).unwrap();
        assert_eq!(
            coded,
            serde_json::json!({"error": "AsyncRequired", "description": "nope"})
        );
    }
}
