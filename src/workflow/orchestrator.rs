//! # Workflow Orchestrator
//!
//! Executes a multi-backend scenario as a small state machine:
//!
//! ```text
//! Idle -> Setup -> Running(0..n) -> AllStepsPassed ------------------------> Teardown -> Done
//!                        |                                                      ^
//!                        +-> StepFailed -> CaptureFailure -> Rollback ----------+
//! ```
//!
//! ## Outcome rules
//!
//! - **Passed**: setup, every step and teardown succeeded
//! - **Failed**: a step or validation failed, setup and teardown completed
//! - **Error**: setup or teardown failed, or the run was cancelled
//!
//! Teardown runs exactly once whatever happened before it. If it fails after
//! an earlier failure, both errors are kept in a
//! [`WorkflowError::Combined`].

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backends::BackendSet;
use super::error::WorkflowError;
use super::failure::{FailureContext, LogTrail};
use super::step::WorkflowStep;
use crate::config::WorkflowConfig;
use crate::constants::{Backend, ExecutionStatus};
use crate::execution::ExecutionResult;
use crate::logging::log_workflow_operation;

type Hook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A named scenario: optional setup, ordered steps, optional teardown
#[derive(Clone)]
pub struct Workflow {
    name: String,
    setup: Option<Hook>,
    steps: Vec<WorkflowStep>,
    teardown: Option<Hook>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup: None,
            steps: Vec::new(),
            teardown: None,
        }
    }

    pub fn setup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.setup = Some(Arc::new(move || -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(hook())
        }));
        self
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn teardown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.teardown = Some(Arc::new(move || -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(hook())
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("has_setup", &self.setup.is_some())
            .field("steps", &self.steps)
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

/// States a workflow execution passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Setup,
    Running { step: usize },
    AllStepsPassed,
    StepFailed { step: usize },
    CaptureFailure,
    Rollback,
    Teardown,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub index: usize,
    pub backend: Backend,
    pub status: ExecutionStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackRecord {
    pub step_name: String,
    pub step_index: usize,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Everything one workflow execution produced
#[derive(Debug)]
pub struct WorkflowResult {
    pub workflow: String,
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub steps: Vec<StepRecord>,
    pub failure: Option<FailureContext>,
    /// Compensations in the order they ran (reverse step order)
    pub rollback: Vec<RollbackRecord>,
    pub phases: Vec<WorkflowPhase>,
    pub logs: Vec<String>,
    pub error: Option<WorkflowError>,
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Flatten into an [`ExecutionResult`] with one sub-result per executed step
    pub fn to_execution_result(&self) -> ExecutionResult {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                let result = ExecutionResult::new(step.name.clone(), step.status)
                    .with_timing(self.started_at, step.duration);
                match &step.error {
                    Some(error) => result.with_error(error.clone()),
                    None => result,
                }
            })
            .collect();

        let result = ExecutionResult::new(self.workflow.clone(), self.status)
            .with_steps(steps)
            .with_timing(self.started_at, self.duration);
        match &self.error {
            Some(error) => result.with_error(error.to_string()),
            None => result,
        }
    }
}

/// Runs workflows against a fixed set of backends
pub struct WorkflowOrchestrator {
    config: WorkflowConfig,
    backends: BackendSet,
}

/// Mutable state of a single execution
struct Execution {
    phases: Vec<WorkflowPhase>,
    steps: Vec<StepRecord>,
    rollback: Vec<RollbackRecord>,
    failure: Option<FailureContext>,
    logs: LogTrail,
}

impl Execution {
    fn enter(&mut self, phase: WorkflowPhase) {
        debug!(phase = ?phase, "🔀 WORKFLOW: Phase transition");
        self.phases.push(phase);
    }
}

impl WorkflowOrchestrator {
    pub fn new(config: WorkflowConfig, backends: BackendSet) -> Self {
        Self { config, backends }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    pub async fn execute(&self, workflow: &Workflow) -> WorkflowResult {
        self.execute_with(workflow, &CancellationToken::new()).await
    }

    /// Execute a workflow, stopping before the next step once `cancel` fires
    ///
    /// Teardown still runs after cancellation.
    pub async fn execute_with(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> WorkflowResult {
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let mut run = Execution {
            phases: vec![WorkflowPhase::Idle],
            steps: Vec::with_capacity(workflow.steps.len()),
            rollback: Vec::new(),
            failure: None,
            logs: LogTrail::new(self.config.max_log_lines),
        };

        log_workflow_operation(
            "start",
            &workflow.name,
            &execution_id.to_string(),
            "running",
            Some(&format!("{} step(s)", workflow.steps.len())),
        );
        run.logs.info(format!("workflow '{}' started", workflow.name));

        let mut status = ExecutionStatus::Passed;
        let mut error: Option<WorkflowError> = None;

        run.enter(WorkflowPhase::Setup);
        match self.run_hook(workflow.setup.as_ref()).await {
            Ok(()) => {
                run.logs.info("setup complete");
                if let Err(e) = self.run_steps(workflow, cancel, &mut run).await {
                    status = if matches!(e, WorkflowError::Cancelled { .. }) {
                        ExecutionStatus::Error
                    } else {
                        ExecutionStatus::Failed
                    };
                    error = Some(e);
                }
            }
            Err(source) => {
                run.logs.error(format!("setup failed: {source}"));
                warn!(workflow = %workflow.name, error = %source, "⚠️ WORKFLOW: Setup failed, skipping steps");
                status = ExecutionStatus::Error;
                error = Some(WorkflowError::SetupFailed {
                    workflow: workflow.name.clone(),
                    source,
                });
            }
        }

        run.enter(WorkflowPhase::Teardown);
        if let Err(source) = self.run_hook(workflow.teardown.as_ref()).await {
            run.logs.error(format!("teardown failed: {source}"));
            warn!(workflow = %workflow.name, error = %source, "⚠️ WORKFLOW: Teardown failed");
            let teardown = WorkflowError::TeardownFailed {
                workflow: workflow.name.clone(),
                source,
            };
            error = Some(WorkflowError::with_teardown_failure(error, teardown));
            status = ExecutionStatus::Error;
        } else {
            run.logs.info("teardown complete");
        }
        run.enter(WorkflowPhase::Done);

        let duration = started.elapsed();
        log_workflow_operation(
            "finish",
            &workflow.name,
            &execution_id.to_string(),
            status.as_str(),
            error.as_ref().map(|e| e.to_string()).as_deref(),
        );

        WorkflowResult {
            workflow: workflow.name.clone(),
            execution_id,
            status,
            started_at,
            duration,
            steps: run.steps,
            failure: run.failure,
            rollback: run.rollback,
            phases: run.phases,
            logs: run.logs.into_lines(),
            error,
        }
    }

    async fn run_steps(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
        run: &mut Execution,
    ) -> Result<(), WorkflowError> {
        for (index, step) in workflow.steps.iter().enumerate() {
            run.enter(WorkflowPhase::Running { step: index });
            run.logs
                .info(format!("step {index} '{}' on {} backend", step.name, step.backend()));

            let step_started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(WorkflowError::Cancelled { step: step.name.clone() }),
                outcome = self.run_step(index, step) => outcome,
            };

            let failed_status = match &outcome {
                Ok(()) => None,
                Err(WorkflowError::Cancelled { .. }) => Some(ExecutionStatus::Error),
                Err(_) => Some(ExecutionStatus::Failed),
            };
            run.steps.push(StepRecord {
                name: step.name.clone(),
                index,
                backend: step.backend(),
                status: failed_status.unwrap_or(ExecutionStatus::Passed),
                duration: step_started.elapsed(),
                error: outcome.as_ref().err().map(|e| e.to_string()),
            });

            if let Err(error) = outcome {
                run.enter(WorkflowPhase::StepFailed { step: index });
                run.logs.error(format!("step {index} '{}' failed: {error}", step.name));
                warn!(
                    workflow = %workflow.name,
                    step = %step.name,
                    index = index,
                    error = %error,
                    "❌ WORKFLOW: Step failed"
                );

                run.enter(WorkflowPhase::CaptureFailure);
                run.failure = Some(self.capture_failure(index, step, &error, &run.logs).await);

                run.enter(WorkflowPhase::Rollback);
                self.rollback(&workflow.steps[..index], run).await;
                return Err(error);
            }
        }

        run.enter(WorkflowPhase::AllStepsPassed);
        run.logs.info("all steps passed");
        Ok(())
    }

    async fn run_step(&self, index: usize, step: &WorkflowStep) -> Result<(), WorkflowError> {
        let timeout = step
            .timeout
            .unwrap_or_else(|| self.config.default_step_timeout());

        let output = self
            .backends
            .perform(&step.action, timeout, step.retries)
            .await
            .map_err(|source| WorkflowError::StepFailed {
                step: step.name.clone(),
                index,
                source: Box::new(source),
            })?;

        for validation in &step.validations {
            validation
                .check(&output)
                .map_err(|message| WorkflowError::AssertionFailed {
                    step: step.name.clone(),
                    index,
                    message,
                })?;
        }
        Ok(())
    }

    async fn capture_failure(
        &self,
        index: usize,
        step: &WorkflowStep,
        error: &WorkflowError,
        logs: &LogTrail,
    ) -> FailureContext {
        let backend = step.backend();
        let mut diagnostics = if self.config.capture_backend_snapshots {
            self.backends.snapshots().await
        } else {
            Default::default()
        };

        let snapshot = diagnostics.remove(&backend);
        diagnostics.insert(
            backend,
            json!({
                "action": step.action.describe(),
                "snapshot": snapshot,
            }),
        );

        FailureContext {
            step_name: step.name.clone(),
            step_index: index,
            backend,
            error: error.to_string(),
            diagnostics,
            logs: logs.snapshot(),
            captured_at: Utc::now(),
        }
    }

    /// Run compensations of the already-completed steps in reverse order
    async fn rollback(&self, completed: &[WorkflowStep], run: &mut Execution) {
        for (index, step) in completed.iter().enumerate().rev() {
            let Some(compensation) = &step.compensation else {
                continue;
            };

            let outcome = self
                .backends
                .perform(compensation, self.config.default_step_timeout(), 0)
                .await
                .map_err(|source| WorkflowError::RollbackFailed {
                    step: step.name.clone(),
                    source: Box::new(source),
                });

            match &outcome {
                Ok(_) => run.logs.info(format!("rolled back step {index} '{}'", step.name)),
                Err(e) => {
                    run.logs.warn(e.to_string());
                    warn!(step = %step.name, error = %e, "⚠️ WORKFLOW: Rollback step failed");
                }
            }

            run.rollback.push(RollbackRecord {
                step_name: step.name.clone(),
                step_index: index,
                succeeded: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }

        // Rollback problems are reported, never escalated
        if let Some(failure) = run.failure.as_mut() {
            failure.logs = run.logs.snapshot();
        }
        info!(compensations = run.rollback.len(), "🔀 WORKFLOW: Rollback complete");
    }

    async fn run_hook(&self, hook: Option<&Hook>) -> anyhow::Result<()> {
        let Some(hook) = hook else {
            return Ok(());
        };
        let timeout = self.config.default_step_timeout();
        match tokio::time::timeout(timeout, hook()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("timed out after {timeout:?}")),
        }
    }
}
