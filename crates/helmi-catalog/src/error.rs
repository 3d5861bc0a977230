//! Catalog error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A definition file did not split into service, values and
    /// credentials documents
    #[error("service file {file}: must contain 3 yaml document parts, found {found}")]
    DocumentCount { file: String, found: usize },

    /// The service descriptor document failed to decode
    #[error("failed to parse service definition in {file}: {source}")]
    Definition {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Template compilation or rendering failed
    #[error(transparent)]
    Engine(#[from] helmi_engine::EngineError),

    /// A rendered template produced a document we could not deserialize
    #[error("could not deserialize rendered {section} document: {source}")]
    RenderedDocument {
        section: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// The source yielded no service definitions at all
    #[error("no services found in catalog source: {origin}")]
    EmptySource { origin: String },

    /// Release values carry no metadata block
    #[error("no release metadata found in chart values")]
    MissingMetadata,

    /// Release values carry a metadata block without the identity keys
    #[error("incomplete release metadata in chart values")]
    IncompleteMetadata,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch catalog: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid catalog archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}
