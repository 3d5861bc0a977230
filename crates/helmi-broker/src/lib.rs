//! helmi-broker - the Open Service Broker frontend
//!
//! Ties the catalog, the chart engine and the cluster together: OSBAPI
//! requests map onto release operations, release state maps back onto
//! last-operation answers, and bind computes credentials from live cluster
//! topology.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod osb;
pub mod release;

pub use config::Config;
pub use error::{BrokerError, Result};
pub use http::{router, AppState};
pub use release::{release_name, Health, OperationState, ReleaseManager};
