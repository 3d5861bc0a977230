//! Broker error types
//!
//! These are the error kinds the OSBAPI layer distinguishes; everything
//! else surfaces as a plain 500 with the underlying message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// The chart engine does not know the release
    #[error("release not found")]
    ReleaseNotFound,

    /// The release exists but has not become available yet
    #[error("service not yet available")]
    NotReady,

    /// Install failed and the release turned out to already exist
    #[error("release already exists")]
    AlreadyExists,

    /// Service or plan id not present in the catalog snapshot
    #[error("unknown service or plan: {0}")]
    UnknownServicePlan(String),

    /// Neither the plan nor the service names a chart
    #[error("no chart specified")]
    MissingChart,

    /// Plan changes are rejected wholesale
    #[error("plan change is not supported")]
    PlanChangeNotSupported,

    /// A configuration variable failed to parse
    #[error("invalid configuration for {name}: {message}")]
    Config { name: &'static str, message: String },

    #[error(transparent)]
    Catalog(#[from] helmi_catalog::CatalogError),

    #[error(transparent)]
    Helm(#[from] helmi_helm::HelmError),

    #[error(transparent)]
    Cluster(#[from] helmi_kube::KubeError),
}
