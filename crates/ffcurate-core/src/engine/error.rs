use thiserror::Error;

use super::config::ConfigError;
use super::store::StoreError;
use crate::core::curation::selector::SelectError;
use crate::core::io::records::LoadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load input: {0}")]
    Load(#[from] LoadError),

    #[error("Batch output failed: {0}")]
    Store(#[from] StoreError),

    #[error("Parameter selection failed: {0}")]
    Select(#[from] SelectError),

    #[error("Parameter '{0}' is not defined by the force field or the auxiliary catalogue")]
    UnknownParameter(String),
}
