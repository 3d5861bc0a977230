//! Error types for the chart-engine adapter

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HelmError>;

#[derive(Debug, Error)]
pub enum HelmError {
    /// The CLI exited non-zero; the message is its trimmed output
    #[error("{message}")]
    Command { message: String },

    /// The CLI did not finish within the configured bound
    #[error("chart engine command timed out after {0:?}")]
    Timeout(Duration),

    /// The CLI binary could not be spawned or fed
    #[error("failed to run chart engine: {0}")]
    Io(#[from] std::io::Error),

    /// Release values could not be decoded
    #[error("failed to decode release values: {0}")]
    Values(#[from] serde_yaml::Error),

    /// Service detail lookup during status resolution failed
    #[error(transparent)]
    Cluster(#[from] helmi_kube::KubeError),

    /// A repository URL could not be parsed
    #[error("invalid repository url '{url}': {source}")]
    RepoUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl HelmError {
    pub(crate) fn command(output: &str) -> Self {
        HelmError::Command {
            message: output.trim().to_string(),
        }
    }
}
