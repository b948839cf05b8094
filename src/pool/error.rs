//! Pool error types.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by [`ResourcePool`](super::ResourcePool) operations
///
/// Timeout and cancellation are separate variants so callers can tell a
/// saturated pool from a caller-side abort.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid size {size} for pool '{pool}': size must be greater than zero")]
    InvalidSize { pool: String, size: usize },

    #[error("Timed out after {timeout:?} waiting to acquire a resource from pool '{pool}'")]
    AcquireTimeout { pool: String, timeout: Duration },

    #[error("Acquire from pool '{pool}' was cancelled")]
    AcquireCancelled { pool: String },

    #[error("Failed to create resource for pool '{pool}': {source}")]
    CreateFailed {
        pool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to replace stale resource in pool '{pool}': {source}")]
    ReplacementFailed {
        pool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Resource {handle_id} was not issued by pool '{pool}'")]
    ForeignHandle { pool: String, handle_id: Uuid },

    #[error("Failed to close {} resource(s) in pool '{pool}': {}", failures.len(), failures.join("; "))]
    CleanupFailed { pool: String, failures: Vec<String> },
}

impl PoolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::AcquireTimeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PoolError::AcquireCancelled { .. })
    }

    /// Name of the pool that produced the error
    pub fn pool(&self) -> &str {
        match self {
            PoolError::InvalidSize { pool, .. }
            | PoolError::AcquireTimeout { pool, .. }
            | PoolError::AcquireCancelled { pool }
            | PoolError::CreateFailed { pool, .. }
            | PoolError::ReplacementFailed { pool, .. }
            | PoolError::ForeignHandle { pool, .. }
            | PoolError::CleanupFailed { pool, .. } => pool,
        }
    }
}
