//! Crate error types.

use thiserror::Error;

use crate::filter::DomainMapError;

/// Kernel errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("domain map error: {0}")]
    DomainMap(#[from] DomainMapError),

    #[error("invalid filter JSON: {0}")]
    FilterJson(#[from] serde_json::Error),

    #[error("filter JSON exceeds maximum size of {max} bytes")]
    FilterTooLarge { max: usize },
}

/// Result type alias using Error.
pub type Result<T> = std::result::Result<T, Error>;
