//! Batch results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::unit::ExecutionResult;
use crate::constants::ExecutionStatus;

/// Status counts for a batch; the four buckets always sum to `total`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                ExecutionStatus::Passed => summary.passed += 1,
                ExecutionStatus::Failed => summary.failed += 1,
                ExecutionStatus::Skipped => summary.skipped += 1,
                ExecutionStatus::Error => summary.error += 1,
            }
        }
        summary
    }
}

/// Every result of one `run`, in submission order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub results: Vec<ExecutionResult>,
    pub summary: Summary,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl AggregateResult {
    pub fn new(results: Vec<ExecutionResult>, started_at: DateTime<Utc>, duration: Duration) -> Self {
        let summary = Summary::from_results(&results);
        Self {
            results,
            summary,
            started_at,
            duration,
        }
    }

    /// No failures and no errors; skipped units do not count against the batch
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0 && self.summary.error == 0
    }

    pub fn get(&self, name: &str) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.name == name)
    }
}
