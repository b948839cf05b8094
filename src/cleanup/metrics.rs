//! Per-run cleanup metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one cleanup task
#[derive(Debug, Clone, Serialize)]
pub struct CleanupTaskRecord {
    pub name: String,
    pub priority: i32,
    pub succeeded: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Summary of a single `execute`/`shutdown` run
///
/// Built once per run and handed to the caller; the coordinator keeps no
/// reference to it.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupMetrics {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    /// Never started because an earlier task failed with `continue_on_error = false`
    pub skipped_tasks: usize,
    pub average_duration: Duration,
    pub total_duration: Duration,
    pub errors: Vec<String>,
    /// Only populated when `enable_metrics` is set
    pub task_records: Vec<CleanupTaskRecord>,
    pub started_at: DateTime<Utc>,
}

impl CleanupMetrics {
    pub(crate) fn empty() -> Self {
        Self {
            total_tasks: 0,
            successful_tasks: 0,
            failed_tasks: 0,
            skipped_tasks: 0,
            average_duration: Duration::ZERO,
            total_duration: Duration::ZERO,
            errors: Vec::new(),
            task_records: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Fraction of executed tasks that succeeded; 1.0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        let executed = self.successful_tasks + self.failed_tasks;
        if executed == 0 {
            1.0
        } else {
            self.successful_tasks as f64 / executed as f64
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed_tasks == 0 && self.skipped_tasks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut metrics = CleanupMetrics::empty();
        assert_eq!(metrics.success_rate(), 1.0);
        assert!(metrics.is_clean());

        metrics.successful_tasks = 3;
        metrics.failed_tasks = 1;
        assert!((metrics.success_rate() - 0.75).abs() < f64::EPSILON);
        assert!(!metrics.is_clean());
    }
}
