//! # Bounded Parallel Executor
//!
//! Runs batches of independent [`ExecutionUnit`]s under a concurrency ceiling.
//!
//! ## Lifecycle of a unit
//!
//! 1. A task is spawned per unit and waits for a semaphore permit, unless
//!    the executor has stopped admitting work, in which case it reports an
//!    `Error` result without running.
//! 2. The unit runs in its own spawned task with a child cancellation token
//!    and the configured `resource_timeout`.
//! 3. Timeout, shutdown and panics all become `Error` results; the unit's own
//!    work is cancelled cooperatively and never aborted.
//!
//! Results come back over a channel sized to the batch and are assembled in
//! submission order once every unit has reported.
//!
//! ## Shutdown
//!
//! Shutdown first stops admitting queued units. With `graceful_shutdown`
//! it then waits up to `resource_timeout` for running units to drain before
//! cancelling whatever is left.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::aggregate::AggregateResult;
use super::error::ExecutorError;
use super::unit::{ExecutionResult, ExecutionUnit};
use crate::config::ExecutorConfig;
use crate::error::describe_join_error;

/// Bookkeeping shared with every spawned unit task
#[derive(Default)]
struct InFlight {
    units: DashMap<Uuid, String>,
    active: AtomicUsize,
    drained: Notify,
}

impl InFlight {
    fn enter(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.units.insert(id, name.to_string());
        self.active.fetch_add(1, Ordering::AcqRel);
        id
    }

    fn leave(&self, id: &Uuid) {
        self.units.remove(id);
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

#[derive(Clone)]
struct UnitContext {
    semaphore: Arc<Semaphore>,
    admission: CancellationToken,
    abort: CancellationToken,
    timeout: Duration,
    in_flight: Arc<InFlight>,
}

/// Runs test units with at most `max_concurrency` in flight
pub struct BoundedParallelExecutor {
    config: ExecutorConfig,
    semaphore: Arc<Semaphore>,
    concurrency: AtomicUsize,
    /// Cancelled first on shutdown: queued units stop waiting for permits
    admission: CancellationToken,
    /// Parent of every running unit's token
    abort: CancellationToken,
    in_flight: Arc<InFlight>,
    shutdown: AtomicBool,
}

impl BoundedParallelExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        if config.max_concurrency == 0 {
            return Err(ExecutorError::InvalidConcurrency { requested: 0 });
        }

        info!(
            max_concurrency = config.max_concurrency,
            resource_timeout_ms = config.resource_timeout_ms,
            "⚡ EXECUTOR: Created bounded parallel executor"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
            concurrency: AtomicUsize::new(config.max_concurrency),
            admission: CancellationToken::new(),
            abort: CancellationToken::new(),
            in_flight: Arc::new(InFlight::default()),
            shutdown: AtomicBool::new(false),
            config,
        })
    }

    /// Executor sized to the host CPU count
    pub fn with_defaults() -> Result<Self, ExecutorError> {
        Self::new(ExecutorConfig::default())
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::Acquire)
    }

    /// Units currently executing (permits held)
    pub fn active_count(&self) -> usize {
        self.in_flight.active.load(Ordering::Acquire)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Change the ceiling shared by every run, including runs in progress
    ///
    /// Growing takes effect immediately. Shrinking retires free permits at
    /// once and the rest as running units finish, so the call never blocks.
    pub fn set_concurrency(&self, n: usize) -> Result<(), ExecutorError> {
        if n == 0 {
            return Err(ExecutorError::InvalidConcurrency { requested: n });
        }
        let previous = self.concurrency.swap(n, Ordering::AcqRel);

        if n > previous {
            self.semaphore.add_permits(n - previous);
        } else if n < previous {
            self.retire_permits(previous - n);
        }

        debug!(previous = previous, current = n, "⚡ EXECUTOR: Concurrency changed");
        Ok(())
    }

    fn retire_permits(&self, count: usize) {
        let mut retired = 0;
        while retired < count {
            match self.semaphore.try_acquire() {
                Ok(permit) => {
                    permit.forget();
                    retired += 1;
                }
                Err(_) => break,
            }
        }

        let outstanding = count - retired;
        if outstanding == 0 {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                outstanding = outstanding,
                "⚠️ EXECUTOR: No runtime to retire busy permits, ceiling shrinks as capacity frees up"
            );
            return;
        };

        let semaphore = self.semaphore.clone();
        let abort = self.abort.clone();
        let wanted = u32::try_from(outstanding).unwrap_or(u32::MAX);
        handle.spawn(async move {
            tokio::select! {
                _ = abort.cancelled() => {}
                permits = semaphore.acquire_many_owned(wanted) => {
                    if let Ok(permits) = permits {
                        permits.forget();
                    }
                }
            }
        });
    }

    /// Run a batch and wait for every unit to report
    ///
    /// Always yields exactly one result per submitted unit, in submission order.
    #[instrument(skip(self, units), fields(units = units.len()))]
    pub async fn run(
        &self,
        units: Vec<Arc<dyn ExecutionUnit>>,
    ) -> Result<AggregateResult, ExecutorError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let expected = units.len();

        if expected == 0 {
            return Ok(AggregateResult::new(Vec::new(), started_at, Duration::ZERO));
        }

        if self.is_shutdown() {
            warn!(units = expected, "⚡ EXECUTOR: Run after shutdown, units will not start");
        }

        let context = UnitContext {
            semaphore: self.semaphore.clone(),
            admission: self.admission.clone(),
            abort: self.abort.clone(),
            timeout: self.config.resource_timeout(),
            in_flight: self.in_flight.clone(),
        };

        let (tx, mut rx) = mpsc::channel(expected);
        for (index, unit) in units.into_iter().enumerate() {
            let tx = tx.clone();
            let context = context.clone();
            tokio::spawn(async move {
                let result = run_unit(unit, context).await;
                // Receiver only goes away if the caller dropped the run future
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut slots: Vec<Option<ExecutionResult>> = (0..expected).map(|_| None).collect();
        while let Some((index, result)) = rx.recv().await {
            slots[index] = Some(result);
        }

        let results: Vec<ExecutionResult> = slots.into_iter().flatten().collect();
        if results.len() != expected {
            return Err(ExecutorError::ResultsIncomplete {
                expected,
                received: results.len(),
            });
        }

        let aggregate = AggregateResult::new(results, started_at, started.elapsed());
        info!(
            total = aggregate.summary.total,
            passed = aggregate.summary.passed,
            failed = aggregate.summary.failed,
            skipped = aggregate.summary.skipped,
            error = aggregate.summary.error,
            duration_ms = aggregate.duration.as_millis() as u64,
            "⚡ EXECUTOR: Batch complete"
        );
        Ok(aggregate)
    }

    /// Stop the executor; later calls are no-ops
    ///
    /// Queued units report `Error` immediately. Running units are given up to
    /// `resource_timeout` to finish when `graceful_shutdown` is set, then
    /// cancelled.
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("⚡ EXECUTOR: Shutdown already performed");
            return;
        }

        info!(active = self.active_count(), "🛑 EXECUTOR: Shutting down");
        self.admission.cancel();

        if self.config.graceful_shutdown {
            self.wait_for_drain(self.config.resource_timeout()).await;
        }

        let abandoned: Vec<String> = self
            .in_flight
            .units
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        if !abandoned.is_empty() {
            warn!(
                count = abandoned.len(),
                units = ?abandoned,
                "⚠️ EXECUTOR: Cancelling units still in flight"
            );
        }
        self.abort.cancel();
    }

    async fn wait_for_drain(&self, limit: Duration) {
        let drained = async {
            loop {
                let notified = self.in_flight.drained.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.active_count() == 0 {
                    return;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(limit, drained).await {
            Ok(()) => debug!("⚡ EXECUTOR: In-flight units drained"),
            Err(_) => warn!(
                active = self.active_count(),
                "⏰ EXECUTOR: Graceful drain timed out"
            ),
        }
    }
}

async fn run_unit(unit: Arc<dyn ExecutionUnit>, context: UnitContext) -> ExecutionResult {
    let name = unit.name().to_string();

    let _permit = tokio::select! {
        biased;
        _ = context.admission.cancelled() => {
            return ExecutionResult::error(name, "executor shut down before unit started");
        }
        permit = context.semaphore.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return ExecutionResult::error(name, "executor semaphore closed"),
        },
    };

    if context.admission.is_cancelled() {
        return ExecutionResult::error(name, "executor shut down before unit started");
    }

    let started_at = Utc::now();
    let started = Instant::now();
    let token = context.abort.child_token();
    let flight_id = context.in_flight.enter(&name);
    debug!(unit = %name, "⚡ EXECUTOR: Unit started");

    let unit_token = token.clone();
    let handle = tokio::spawn(async move { unit.execute(unit_token).await });

    let result = tokio::select! {
        biased;
        joined = handle => match joined {
            Ok(result) => result,
            Err(e) => {
                let message = describe_join_error(e);
                warn!(unit = %name, error = %message, "⚠️ EXECUTOR: Unit panicked");
                ExecutionResult::error(name.clone(), message)
            }
        },
        _ = tokio::time::sleep(context.timeout) => {
            token.cancel();
            warn!(
                unit = %name,
                timeout_ms = context.timeout.as_millis() as u64,
                "⏰ EXECUTOR: Unit timed out"
            );
            ExecutionResult::error(name.clone(), format!("timed out after {:?}", context.timeout))
        }
        _ = token.cancelled() => {
            ExecutionResult::error(name.clone(), "cancelled by executor shutdown")
        }
    };

    context.in_flight.leave(&flight_id);
    let result = result.with_timing(started_at, started.elapsed());
    debug!(
        unit = %name,
        status = %result.status,
        duration_ms = result.duration.as_millis() as u64,
        "⚡ EXECUTOR: Unit finished"
    );
    result
}
