//! # Cleanup Coordinator
//!
//! Priority-ordered teardown of everything a test run registered.
//!
//! ## Execution modes
//!
//! - `max_concurrent <= 1`: tasks run one after another, strictly by
//!   descending priority (ties in registration order). With
//!   `continue_on_error = false` the first failure stops the run and the
//!   remaining tasks are reported as skipped.
//! - `max_concurrent > 1`: tasks run under a semaphore of that width. No
//!   ordering holds between tasks running at the same time; callers that
//!   need strict ordering must use sequential mode.
//!
//! Every task gets its own timeout and a child cancellation token. A task
//! that times out is reported as failed, but its callback keeps running in
//! the background until it notices the token or finishes.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::CleanupError;
use super::metrics::{CleanupMetrics, CleanupTaskRecord};
use super::task::{insert_by_priority, CleanupTask};
use crate::config::CleanupConfig;
use crate::error::describe_join_error;
use crate::logging::log_cleanup_operation;
use crate::registry::ManagedResource;

struct TaskOutcome {
    name: String,
    priority: i32,
    duration: Duration,
    result: Result<(), CleanupError>,
}

/// Runs registered teardown callbacks by priority
pub struct CleanupCoordinator {
    config: CleanupConfig,
    tasks: Mutex<Vec<CleanupTask>>,
    shutdown: AtomicBool,
    token: CancellationToken,
}

impl CleanupCoordinator {
    pub fn new(config: CleanupConfig) -> Self {
        debug!(
            max_concurrent = config.max_concurrent,
            continue_on_error = config.continue_on_error,
            "🧹 CLEANUP: Created coordinator"
        );
        Self {
            config,
            tasks: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
            token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Queue a callback with the default timeout
    pub fn register<F, Fut>(&self, name: impl Into<String>, priority: i32, callback: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_with_timeout(name, priority, self.config.default_timeout(), callback);
    }

    pub fn register_with_timeout<F, Fut>(
        &self,
        name: impl Into<String>,
        priority: i32,
        timeout: Duration,
        callback: F,
    ) where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_task(CleanupTask::new(name, priority, timeout, callback));
    }

    /// Queue a prepared task
    ///
    /// After [`shutdown`](Self::shutdown) this silently drops the task.
    pub fn register_task(&self, task: CleanupTask) {
        let mut tasks = self.tasks.lock();
        if self.shutdown.load(Ordering::Acquire) {
            debug!(task = %task.name(), "🧹 CLEANUP: Coordinator shut down, ignoring registration");
            return;
        }
        debug!(
            task = %task.name(),
            priority = task.priority(),
            "🧹 CLEANUP: Registered task"
        );
        insert_by_priority(&mut tasks, task);
    }

    /// Queue a managed resource's own cleanup
    pub fn register_resource(&self, resource: Arc<dyn ManagedResource>, priority: i32) {
        let name = format!("resource:{}", resource.id());
        self.register(name, priority, move |_token| async move {
            resource.cleanup().await
        });
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Run and drain every queued task
    pub async fn execute(&self) -> CleanupMetrics {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut metrics = CleanupMetrics::empty();
        metrics.total_tasks = tasks.len();
        if tasks.is_empty() {
            return metrics;
        }

        info!(
            tasks = tasks.len(),
            max_concurrent = self.config.max_concurrent,
            "🧹 CLEANUP: Executing cleanup tasks"
        );

        let started = Instant::now();
        let (outcomes, skipped) = if self.config.max_concurrent <= 1 {
            self.run_sequential(tasks).await
        } else {
            (self.run_concurrent(tasks).await, 0)
        };

        metrics.skipped_tasks = skipped;
        metrics.total_duration = started.elapsed();
        self.summarise(&mut metrics, outcomes);

        if self.config.enable_metrics {
            log_cleanup_operation(
                "execute",
                metrics.total_tasks,
                metrics.successful_tasks,
                metrics.failed_tasks,
                metrics.total_duration.as_millis() as u64,
            );
        }
        metrics
    }

    /// Stop accepting tasks and run whatever is queued
    ///
    /// A second call finds nothing to run and returns empty metrics.
    pub async fn shutdown(&self) -> CleanupMetrics {
        {
            let _tasks = self.tasks.lock();
            if self.shutdown.swap(true, Ordering::AcqRel) {
                debug!("🧹 CLEANUP: Shutdown already performed");
                return CleanupMetrics::empty();
            }
        }

        info!("🛑 CLEANUP: Shutting down coordinator");
        let metrics = self.execute().await;
        // Signal any timed-out callbacks still running in the background
        self.token.cancel();
        metrics
    }

    async fn run_sequential(&self, tasks: Vec<CleanupTask>) -> (Vec<TaskOutcome>, usize) {
        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut remaining = tasks.into_iter();

        while let Some(task) = remaining.next() {
            let outcome = run_task(task, &self.token).await;
            let failed = outcome.result.is_err();
            outcomes.push(outcome);

            if failed && !self.config.continue_on_error {
                let skipped = remaining.len();
                warn!(
                    skipped = skipped,
                    "⚠️ CLEANUP: Stopping after failure (continue_on_error = false)"
                );
                return (outcomes, skipped);
            }
        }
        (outcomes, 0)
    }

    async fn run_concurrent(&self, tasks: Vec<CleanupTask>) -> Vec<TaskOutcome> {
        let semaphore = Semaphore::new(self.config.max_concurrent);
        let semaphore = &semaphore;
        let token = &self.token;

        futures::future::join_all(tasks.into_iter().map(|task| async move {
            let _permit = semaphore.acquire().await;
            run_task(task, token).await
        }))
        .await
    }

    fn summarise(&self, metrics: &mut CleanupMetrics, outcomes: Vec<TaskOutcome>) {
        let executed = outcomes.len();
        let mut total = Duration::ZERO;

        for outcome in outcomes {
            total += outcome.duration;
            let error = match outcome.result {
                Ok(()) => {
                    metrics.successful_tasks += 1;
                    None
                }
                Err(e) => {
                    metrics.failed_tasks += 1;
                    warn!(task = %outcome.name, error = %e, "⚠️ CLEANUP: Task failed");
                    let message = e.to_string();
                    metrics.errors.push(message.clone());
                    Some(message)
                }
            };

            if self.config.enable_metrics {
                metrics.task_records.push(CleanupTaskRecord {
                    name: outcome.name,
                    priority: outcome.priority,
                    succeeded: error.is_none(),
                    duration: outcome.duration,
                    error,
                });
            }
        }

        if executed > 0 {
            metrics.average_duration = total / executed as u32;
        }
    }
}

async fn run_task(task: CleanupTask, parent: &CancellationToken) -> TaskOutcome {
    let (name, priority, timeout, callback) = task.into_parts();
    let token = parent.child_token();
    let started = Instant::now();

    // Spawned so a callback that ignores its token is abandoned, not blocked on
    let handle = tokio::spawn(callback(token.clone()));

    let result = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(source))) => Err(CleanupError::Failed {
            task: name.clone(),
            source,
        }),
        Ok(Err(join_error)) => Err(CleanupError::Panicked {
            task: name.clone(),
            message: describe_join_error(join_error),
        }),
        Err(_) => {
            token.cancel();
            Err(CleanupError::TimedOut {
                task: name.clone(),
                timeout,
            })
        }
    };

    let duration = started.elapsed();
    debug!(
        task = %name,
        priority = priority,
        duration_ms = duration.as_millis() as u64,
        succeeded = result.is_ok(),
        "🧹 CLEANUP: Task finished"
    );

    TaskOutcome {
        name,
        priority,
        duration,
        result,
    }
}
