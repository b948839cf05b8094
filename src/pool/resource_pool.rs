//! # Generic Resource Pool
//!
//! A bounded pool of homogeneous, expensive-to-create resources. One
//! implementation serves every resource kind; the kind-specific behaviour
//! lives behind [`ResourceFactory`].
//!
//! ## Capacity model
//!
//! The idle queue doubles as free-list and semaphore: `outstanding` counts
//! every resource that exists (idle, checked out, or being created) and is
//! never allowed above `max_size`. Waiters park on a [`Notify`] and are woken
//! whenever a resource is returned or a slot is freed.
//!
//! ## Acquire
//!
//! 1. Take an idle resource if one is queued, health-checking it first; a
//!    stale resource is closed and transparently replaced.
//! 2. Otherwise create one lazily if `outstanding < max_size`.
//! 3. Otherwise wait for the first of: a wakeup, the deadline, cancellation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::PoolError;
use super::resource::{PooledResource, ResourceFactory};
use super::stats::{PoolCounters, PoolStats};
use crate::config::PoolConfig;
use crate::constants::ResourceKind;

struct PoolState<T> {
    idle: VecDeque<PooledResource<T>>,
    max_size: usize,
    outstanding: usize,
    initialized: bool,
    counters: PoolCounters,
    last_activity: DateTime<Utc>,
}

enum Reservation<T> {
    Idle(PooledResource<T>),
    Create,
    Exhausted,
}

/// Bounded pool of resources produced by a [`ResourceFactory`]
pub struct ResourcePool<F: ResourceFactory> {
    id: Uuid,
    name: String,
    factory: F,
    acquire_timeout: Duration,
    min_idle: usize,
    state: Mutex<PoolState<F::Resource>>,
    available: Notify,
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Create an empty pool; resources are created lazily or by [`initialize`](Self::initialize)
    pub fn new(name: impl Into<String>, factory: F, config: PoolConfig) -> Result<Self, PoolError> {
        let name = name.into();
        if config.max_size == 0 {
            return Err(PoolError::InvalidSize {
                pool: name,
                size: config.max_size,
            });
        }

        info!(
            pool = %name,
            kind = %factory.kind(),
            max_size = config.max_size,
            acquire_timeout_ms = config.acquire_timeout_ms,
            "🏊 POOL: Creating resource pool"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            factory,
            acquire_timeout: config.acquire_timeout(),
            min_idle: config.min_idle.min(config.max_size),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.max_size),
                max_size: config.max_size,
                outstanding: 0,
                initialized: false,
                counters: PoolCounters::default(),
                last_activity: Utc::now(),
            }),
            available: Notify::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.factory.kind()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn max_size(&self) -> usize {
        self.state.lock().max_size
    }

    /// Warm the pool with `min_idle` resources
    ///
    /// Calling it again after a successful warm-up is a no-op until the next
    /// [`cleanup`](Self::cleanup).
    #[instrument(skip(self), fields(pool = %self.name))]
    pub async fn initialize(&self) -> Result<(), PoolError> {
        if self.state.lock().initialized {
            return Ok(());
        }

        let mut warmed = 0;
        while warmed < self.min_idle {
            let Some(slot) = self.reserve_slot() else {
                break;
            };
            let resource = self
                .factory
                .create()
                .await
                .map_err(|source| PoolError::CreateFailed {
                    pool: self.name.clone(),
                    source,
                })?;
            slot.disarm();

            {
                let mut state = self.state.lock();
                state.idle.push_back(PooledResource::new(self.id, resource));
                state.counters.created += 1;
                state.last_activity = Utc::now();
            }
            self.available.notify_one();
            warmed += 1;
        }

        self.state.lock().initialized = true;
        info!(pool = %self.name, warmed = warmed, "✅ POOL: Initialized");
        Ok(())
    }

    /// Acquire using the configured timeout and no external cancellation
    pub async fn acquire(&self) -> Result<PooledResource<F::Resource>, PoolError> {
        self.acquire_with(&CancellationToken::new(), self.acquire_timeout)
            .await
    }

    /// Acquire a resource, waiting at most `timeout` and aborting when `cancel` fires
    ///
    /// A timeout too large to represent as a deadline (e.g. `Duration::MAX`)
    /// waits without one.
    pub async fn acquire_with(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<PooledResource<F::Resource>, PoolError> {
        let deadline = Instant::now().checked_add(timeout);

        loop {
            // Register interest before inspecting state so a release between
            // the check and the wait is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_reserve() {
                Reservation::Idle(resource) => return self.checkout_pooled(resource).await,
                Reservation::Create => return self.checkout_new().await,
                Reservation::Exhausted => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.state.lock().counters.acquire_cancellations += 1;
                    self.pass_on_wakeup();
                    debug!(pool = %self.name, "🏊 POOL: Acquire cancelled");
                    return Err(PoolError::AcquireCancelled {
                        pool: self.name.clone(),
                    });
                }
                _ = &mut notified => {}
                _ = wait_for_deadline(deadline) => {
                    self.state.lock().counters.acquire_timeouts += 1;
                    self.pass_on_wakeup();
                    warn!(
                        pool = %self.name,
                        timeout_ms = timeout.as_millis() as u64,
                        "⏰ POOL: Acquire timed out"
                    );
                    return Err(PoolError::AcquireTimeout {
                        pool: self.name.clone(),
                        timeout,
                    });
                }
            }
        }
    }

    /// Return a resource to the pool
    ///
    /// Unhealthy resources are closed instead of queued, as are resources
    /// that no longer fit after a shrink.
    pub async fn release(&self, mut handle: PooledResource<F::Resource>) -> Result<(), PoolError> {
        if handle.pool_id() != self.id {
            return Err(PoolError::ForeignHandle {
                pool: self.name.clone(),
                handle_id: handle.id(),
            });
        }

        if !self.factory.validate(handle.get()).await {
            warn!(
                pool = %self.name,
                resource_id = %handle.id(),
                "⚠️ POOL: Released resource failed health check, discarding"
            );
            {
                let mut state = self.state.lock();
                state.counters.released += 1;
                state.counters.health_check_failures += 1;
            }
            self.discard(handle).await;
            return Ok(());
        }

        handle.touch();
        let overflow = {
            let mut state = self.state.lock();
            state.counters.released += 1;
            state.last_activity = Utc::now();
            if state.outstanding > state.max_size || state.idle.len() >= state.max_size {
                Some(handle)
            } else {
                state.idle.push_back(handle);
                None
            }
        };

        match overflow {
            Some(handle) => {
                debug!(
                    pool = %self.name,
                    resource_id = %handle.id(),
                    "🏊 POOL: Pool full on release, closing resource"
                );
                self.discard(handle).await;
            }
            None => self.available.notify_one(),
        }
        Ok(())
    }

    /// Change the capacity
    ///
    /// Idle resources beyond the new capacity are closed. Callers already
    /// waiting in `acquire` keep waiting and are woken if capacity grew.
    #[instrument(skip(self), fields(pool = %self.name))]
    pub async fn resize(&self, new_max: usize) -> Result<(), PoolError> {
        if new_max == 0 {
            return Err(PoolError::InvalidSize {
                pool: self.name.clone(),
                size: new_max,
            });
        }

        let (old_max, evicted) = {
            let mut state = self.state.lock();
            let old_max = state.max_size;
            state.max_size = new_max;

            let mut evicted = Vec::new();
            while state.outstanding > new_max {
                match state.idle.pop_back() {
                    Some(resource) => {
                        state.outstanding -= 1;
                        state.counters.closed += 1;
                        evicted.push(resource);
                    }
                    None => break,
                }
            }
            (old_max, evicted)
        };

        info!(
            pool = %self.name,
            old_max = old_max,
            new_max = new_max,
            evicted = evicted.len(),
            "🔁 POOL: Resized"
        );

        if new_max > old_max {
            self.available.notify_waiters();
        }
        for resource in evicted {
            self.close_resource(resource).await;
        }
        Ok(())
    }

    /// Close every idle resource and reset counters
    ///
    /// Checked-out resources are not reclaimed; they still count against
    /// capacity until released.
    #[instrument(skip(self), fields(pool = %self.name))]
    pub async fn cleanup(&self) -> Result<(), PoolError> {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.outstanding = state.outstanding.saturating_sub(drained.len());
            state.counters = PoolCounters::default();
            state.initialized = false;
            state.last_activity = Utc::now();
            drained
        };
        self.available.notify_waiters();

        let drained_count = drained.len();
        let mut failures = Vec::new();
        for handle in drained {
            let id = handle.id();
            if let Err(e) = self.factory.close(handle.into_inner()).await {
                failures.push(format!("{id}: {e}"));
            }
        }

        info!(
            pool = %self.name,
            closed = drained_count,
            failures = failures.len(),
            "🧹 POOL: Cleanup complete"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PoolError::CleanupFailed {
                pool: self.name.clone(),
                failures,
            })
        }
    }

    /// Snapshot of the pool's counters
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            pool: self.name.clone(),
            kind: self.factory.kind(),
            max_size: state.max_size,
            outstanding: state.outstanding,
            available: state.idle.len(),
            in_use: state.outstanding.saturating_sub(state.idle.len()),
            total_acquired: state.counters.acquired,
            total_released: state.counters.released,
            total_created: state.counters.created,
            total_closed: state.counters.closed,
            health_check_failures: state.counters.health_check_failures,
            acquire_timeouts: state.counters.acquire_timeouts,
            acquire_cancellations: state.counters.acquire_cancellations,
            last_activity: state.last_activity,
        }
    }

    fn try_reserve(&self) -> Reservation<F::Resource> {
        let mut state = self.state.lock();
        if let Some(resource) = state.idle.pop_front() {
            return Reservation::Idle(resource);
        }
        if state.outstanding < state.max_size {
            state.outstanding += 1;
            return Reservation::Create;
        }
        Reservation::Exhausted
    }

    fn reserve_slot(&self) -> Option<SlotGuard<'_, F>> {
        let mut state = self.state.lock();
        if state.outstanding < state.max_size {
            state.outstanding += 1;
            Some(SlotGuard::new(self))
        } else {
            None
        }
    }

    fn release_slot(&self) {
        {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        self.available.notify_one();
    }

    /// Forward a wakeup this waiter may have consumed before giving up
    fn pass_on_wakeup(&self) {
        let has_capacity = {
            let state = self.state.lock();
            !state.idle.is_empty() || state.outstanding < state.max_size
        };
        if has_capacity {
            self.available.notify_one();
        }
    }

    async fn checkout_pooled(
        &self,
        mut resource: PooledResource<F::Resource>,
    ) -> Result<PooledResource<F::Resource>, PoolError> {
        let slot = SlotGuard::new(self);

        if self.factory.validate(resource.get()).await {
            resource.mark_checked_out();
            slot.disarm();
            self.record_acquire(false);
            debug!(
                pool = %self.name,
                resource_id = %resource.id(),
                usage_count = resource.usage_count(),
                "🏊 POOL: Reused pooled resource"
            );
            return Ok(resource);
        }

        warn!(
            pool = %self.name,
            resource_id = %resource.id(),
            "⚠️ POOL: Stale resource on acquire, replacing"
        );
        {
            let mut state = self.state.lock();
            state.counters.health_check_failures += 1;
            state.counters.closed += 1;
        }
        self.close_resource(resource).await;

        let fresh = self
            .factory
            .create()
            .await
            .map_err(|source| PoolError::ReplacementFailed {
                pool: self.name.clone(),
                source,
            })?;
        slot.disarm();

        let mut handle = PooledResource::new(self.id, fresh);
        handle.mark_checked_out();
        self.record_acquire(true);
        Ok(handle)
    }

    async fn checkout_new(&self) -> Result<PooledResource<F::Resource>, PoolError> {
        let slot = SlotGuard::new(self);
        let resource = self
            .factory
            .create()
            .await
            .map_err(|source| PoolError::CreateFailed {
                pool: self.name.clone(),
                source,
            })?;
        slot.disarm();

        let mut handle = PooledResource::new(self.id, resource);
        handle.mark_checked_out();
        self.record_acquire(true);
        debug!(
            pool = %self.name,
            resource_id = %handle.id(),
            "🏊 POOL: Created new resource"
        );
        Ok(handle)
    }

    fn record_acquire(&self, created: bool) {
        let mut state = self.state.lock();
        state.counters.acquired += 1;
        if created {
            state.counters.created += 1;
        }
        state.last_activity = Utc::now();
    }

    async fn discard(&self, handle: PooledResource<F::Resource>) {
        {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            state.counters.closed += 1;
        }
        self.available.notify_one();
        self.close_resource(handle).await;
    }

    async fn close_resource(&self, handle: PooledResource<F::Resource>) {
        let id = handle.id();
        if let Err(e) = self.factory.close(handle.into_inner()).await {
            warn!(
                pool = %self.name,
                resource_id = %id,
                error = %e,
                "⚠️ POOL: Failed to close resource"
            );
        }
    }
}

/// Holds one unit of capacity until disarmed
///
/// Dropping an armed guard (error path or cancelled future) gives the slot back.
async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

struct SlotGuard<'a, F: ResourceFactory> {
    pool: &'a ResourcePool<F>,
    armed: bool,
}

impl<'a, F: ResourceFactory> SlotGuard<'a, F> {
    fn new(pool: &'a ResourcePool<F>) -> Self {
        Self { pool, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<F: ResourceFactory> Drop for SlotGuard<'_, F> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.release_slot();
        }
    }
}
