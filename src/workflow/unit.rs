//! Running workflows under the parallel executor.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::orchestrator::{Workflow, WorkflowOrchestrator};
use crate::execution::{ExecutionResult, ExecutionUnit};

/// A workflow packaged as an [`ExecutionUnit`]
pub struct WorkflowUnit {
    orchestrator: Arc<WorkflowOrchestrator>,
    workflow: Workflow,
}

impl WorkflowUnit {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>, workflow: Workflow) -> Self {
        Self {
            orchestrator,
            workflow,
        }
    }
}

#[async_trait]
impl ExecutionUnit for WorkflowUnit {
    fn name(&self) -> &str {
        self.workflow.name()
    }

    async fn execute(&self, cancel: CancellationToken) -> ExecutionResult {
        self.orchestrator
            .execute_with(&self.workflow, &cancel)
            .await
            .to_execution_result()
    }
}
