//! Failure context and log trail.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

use crate::constants::Backend;

/// Diagnostic snapshot taken at the first failing step of a workflow
///
/// Created at most once per execution and owned by its
/// [`WorkflowResult`](super::WorkflowResult).
#[derive(Debug, Clone, Serialize)]
pub struct FailureContext {
    pub step_name: String,
    pub step_index: usize,
    pub backend: Backend,
    pub error: String,
    /// Per-backend diagnostics; the failing backend's entry carries the request
    pub diagnostics: HashMap<Backend, Value>,
    pub logs: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl FailureContext {
    pub fn diagnostic(&self, backend: Backend) -> Option<&Value> {
        self.diagnostics.get(&backend)
    }
}

/// Bounded, timestamped log of one workflow execution
///
/// The oldest lines are dropped once `max_lines` is reached.
#[derive(Debug)]
pub(crate) struct LogTrail {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl LogTrail {
    pub(crate) fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    pub(crate) fn info(&mut self, message: impl AsRef<str>) {
        self.push("INFO", message.as_ref());
    }

    pub(crate) fn warn(&mut self, message: impl AsRef<str>) {
        self.push("WARN", message.as_ref());
    }

    pub(crate) fn error(&mut self, message: impl AsRef<str>) {
        self.push("ERROR", message.as_ref());
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }

    fn push(&mut self, level: &str, message: &str) {
        if self.lines.len() == self.max_lines {
            self.lines.pop_front();
        }
        self.lines
            .push_back(format!("{} [{level}] {message}", Utc::now().to_rfc3339()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_trail_drops_oldest() {
        let mut trail = LogTrail::new(2);
        trail.info("one");
        trail.warn("two");
        trail.error("three");

        let lines = trail.into_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[WARN] two"));
        assert!(lines[1].ends_with("[ERROR] three"));
    }
}
