//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to compile template '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
