//! Registry error types.

use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Resource '{id}' already exists")]
    AlreadyExists { id: String },

    #[error("Resource registry is at capacity ({max} resources)")]
    CapacityExceeded { max: usize },

    #[error("Resource '{id}' not found")]
    NotFound { id: String },

    /// The resource was removed from the registry even though cleanup failed
    #[error("Cleanup of resource '{id}' failed: {source}")]
    CleanupFailed {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cleanup failed for {} resource(s): {}", failures.len(), failures.join("; "))]
    CleanupErrors { failures: Vec<String> },

    #[error("Resource registry is shut down")]
    ShutDown,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigurationError),
}
