//! The catalog: an atomically swapped snapshot of services
//!
//! Readers take one snapshot per request and keep using it even while a
//! refresh publishes a newer one; published maps are never mutated. A
//! failed reload keeps the previous snapshot active.

use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::service::{Service, ServiceMap};
use crate::source;

/// The hot-reloadable service catalog
pub struct Catalog {
    source: String,
    services: RwLock<Arc<ServiceMap>>,
}

impl Catalog {
    /// Load the catalog from a directory, zip file or zip URL
    pub async fn load(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let services = source::parse_any(&source).await?;

        Ok(Self {
            source,
            services: RwLock::new(Arc::new(services)),
        })
    }

    /// Build a catalog from a single definition document (tests, tooling)
    pub fn from_definition(input: &str) -> Result<Self> {
        let mut services = ServiceMap::new();
        crate::service::add_service_definition(&mut services, input, "<inline>")?;

        Ok(Self {
            source: "<inline>".to_string(),
            services: RwLock::new(Arc::new(services)),
        })
    }

    /// The source this catalog was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current snapshot; stable for as long as the caller holds it
    pub fn services(&self) -> Arc<ServiceMap> {
        self.services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Look up a service by id in the current snapshot
    pub fn service(&self, id: &str) -> Option<Service> {
        self.services().get(id).cloned()
    }

    /// Re-parse the source and atomically publish the new snapshot
    ///
    /// On failure the previous snapshot stays active and the error is
    /// returned for the caller to log.
    pub async fn reload(&self) -> Result<usize> {
        let services = source::parse_any(&self.source).await?;
        let count = services.len();

        let mut guard = self
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(services);

        Ok(count)
    }
}
