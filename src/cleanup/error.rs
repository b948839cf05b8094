//! Cleanup task failure types.

use std::time::Duration;
use thiserror::Error;

/// Why a single cleanup task did not succeed
///
/// These never abort a run on their own; they are collected into
/// [`CleanupMetrics::errors`](super::CleanupMetrics::errors).
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Cleanup task '{task}' failed: {source}")]
    Failed {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The callback may still be running in the background
    #[error("Cleanup task '{task}' timed out after {timeout:?}")]
    TimedOut { task: String, timeout: Duration },

    #[error("Cleanup task '{task}' panicked: {message}")]
    Panicked { task: String, message: String },
}

impl CleanupError {
    pub fn task(&self) -> &str {
        match self {
            Self::Failed { task, .. } | Self::TimedOut { task, .. } | Self::Panicked { task, .. } => {
                task
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}
