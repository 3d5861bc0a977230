//! The broker's embedded metadata block
//!
//! The broker keeps no store of its own, so the link from a release back to
//! its catalog entries is written into the release's chart values under a
//! reserved key. The chart engine persists the values, making them the
//! durable record read back at bind time.

use serde_json::{json, Value as JsonValue};

use crate::error::{CatalogError, Result};
use crate::values::Values;

/// Reserved top-level key in rendered chart values
pub const METADATA_KEY: &str = "__metadata";

const SERVICE_ID_KEY: &str = "helmiServiceId";
const PLAN_ID_KEY: &str = "helmiPlanId";
const INGRESS_DOMAIN_KEY: &str = "helmiSvcDomain";

/// Identity written into a release's values at install time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub service_id: String,
    pub plan_id: String,
    pub ingress_domain: String,
}

impl EmbeddedMetadata {
    /// The metadata block as a mergeable values overlay
    pub fn as_values(&self) -> Values {
        Values(json!({
            METADATA_KEY: {
                SERVICE_ID_KEY: self.service_id,
                PLAN_ID_KEY: self.plan_id,
                INGRESS_DOMAIN_KEY: self.ingress_domain,
            }
        }))
    }

    /// Read the metadata block back out of release values
    ///
    /// Releases installed before ingress domains existed carry an empty
    /// domain; `fallback_ingress_domain` covers those.
    pub fn extract(values: &JsonValue, fallback_ingress_domain: &str) -> Result<Self> {
        let block = values
            .get(METADATA_KEY)
            .and_then(JsonValue::as_object)
            .ok_or(CatalogError::MissingMetadata)?;

        let service_id = block.get(SERVICE_ID_KEY).and_then(JsonValue::as_str);
        let plan_id = block.get(PLAN_ID_KEY).and_then(JsonValue::as_str);

        let (Some(service_id), Some(plan_id)) = (service_id, plan_id) else {
            return Err(CatalogError::IncompleteMetadata);
        };

        let mut ingress_domain = block
            .get(INGRESS_DOMAIN_KEY)
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        if ingress_domain.is_empty() {
            ingress_domain = fallback_ingress_domain.to_string();
        }

        Ok(Self {
            service_id: service_id.to_string(),
            plan_id: plan_id.to_string(),
            ingress_domain,
        })
    }
}
