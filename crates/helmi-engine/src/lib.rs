//! helmi-engine - MiniJinja environment for catalog templates
//!
//! Catalog definitions carry two text templates per service: one producing
//! chart values, one producing bound credentials. This crate owns the
//! template environment both are compiled into: the filter and function set
//! available to service authors, and the compile/render entry points used by
//! the catalog.

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;

pub use engine::{TemplatePair, CREDENTIALS_TEMPLATE, VALUES_TEMPLATE};
pub use error::{EngineError, Result};
