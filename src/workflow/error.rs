//! Workflow error types.

use std::time::Duration;
use thiserror::Error;

use crate::constants::Backend;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Setup of workflow '{workflow}' failed: {source}")]
    SetupFailed {
        workflow: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No {backend} backend configured")]
    BackendUnavailable { backend: Backend },

    #[error("{backend} action timed out after {timeout:?}")]
    ActionTimedOut { backend: Backend, timeout: Duration },

    #[error("{backend} action failed after {attempts} attempt(s): {source}")]
    ActionFailed {
        backend: Backend,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Step '{step}' (index {index}) failed: {source}")]
    StepFailed {
        step: String,
        index: usize,
        #[source]
        source: Box<WorkflowError>,
    },

    /// A validation did not hold; reported as `Failed`, not `Error`
    #[error("Assertion failed in step '{step}' (index {index}): {message}")]
    AssertionFailed {
        step: String,
        index: usize,
        message: String,
    },

    #[error("Workflow cancelled before step '{step}' completed")]
    Cancelled { step: String },

    #[error("Rollback of step '{step}' failed: {source}")]
    RollbackFailed {
        step: String,
        #[source]
        source: Box<WorkflowError>,
    },

    #[error("Teardown of workflow '{workflow}' failed: {source}")]
    TeardownFailed {
        workflow: String,
        #[source]
        source: anyhow::Error,
    },

    /// Teardown failed after the workflow had already failed
    #[error("{primary}; teardown also failed: {teardown}")]
    Combined {
        #[source]
        primary: Box<WorkflowError>,
        teardown: Box<WorkflowError>,
    },
}

impl WorkflowError {
    /// Whether this error came from a failed validation rather than infrastructure
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::AssertionFailed { .. })
    }

    /// Attach a teardown failure to whatever failed before it
    pub fn with_teardown_failure(primary: Option<Self>, teardown: Self) -> Self {
        match primary {
            Some(primary) => Self::Combined {
                primary: Box::new(primary),
                teardown: Box::new(teardown),
            },
            None => teardown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_keeps_both_messages() {
        let step = WorkflowError::AssertionFailed {
            step: "create-user".to_string(),
            index: 1,
            message: "expected status 201, got 500".to_string(),
        };
        let teardown = WorkflowError::TeardownFailed {
            workflow: "signup".to_string(),
            source: anyhow::anyhow!("could not drop schema"),
        };

        let combined = WorkflowError::with_teardown_failure(Some(step), teardown);
        let message = combined.to_string();
        assert!(message.contains("expected status 201"));
        assert!(message.contains("could not drop schema"));
        assert!(!combined.is_assertion());
    }

    #[test]
    fn test_teardown_alone_is_not_wrapped() {
        let teardown = WorkflowError::TeardownFailed {
            workflow: "signup".to_string(),
            source: anyhow::anyhow!("disk full"),
        };
        let error = WorkflowError::with_teardown_failure(None, teardown);
        assert!(matches!(error, WorkflowError::TeardownFailed { .. }));
    }
}
