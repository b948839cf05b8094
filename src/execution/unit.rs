//! Execution units and their results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::constants::ExecutionStatus;

/// Anything the [`BoundedParallelExecutor`](super::BoundedParallelExecutor) can run
///
/// Units are stateless from the executor's point of view. The token is
/// cancelled on timeout or executor shutdown; a unit that ignores it keeps
/// running in the background after its result has been reported.
#[async_trait]
pub trait ExecutionUnit: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, cancel: CancellationToken) -> ExecutionResult;
}

/// Outcome of one unit, optionally with nested step results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub name: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ExecutionResult>,
}

impl ExecutionResult {
    pub fn new(name: impl Into<String>, status: ExecutionStatus) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            status,
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn passed(name: impl Into<String>) -> Self {
        Self::new(name, ExecutionStatus::Passed)
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(name, ExecutionStatus::Failed).with_error(error)
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, ExecutionStatus::Skipped).with_error(reason)
    }

    pub fn error(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(name, ExecutionStatus::Error).with_error(error)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_steps(mut self, steps: Vec<ExecutionResult>) -> Self {
        self.steps = steps;
        self
    }

    /// Set start time and duration; `finished_at` is derived
    pub fn with_timing(mut self, started_at: DateTime<Utc>, duration: Duration) -> Self {
        self.started_at = started_at;
        self.duration = duration;
        self.finished_at = started_at
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
