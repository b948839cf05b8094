//! # Resource Registry
//!
//! Tracks arbitrary managed resources by ID under one global capacity and
//! keeps per-kind lifecycle statistics.
//!
//! ## Key Features
//!
//! - **Reader/writer locking**: stat reads and lookups run concurrently; only
//!   register/unregister take the write lock, and never across an `.await`
//! - **Best-effort removal**: a resource whose cleanup fails is still removed
//!   and counted as leaked
//! - **Snapshot stats**: callers always receive copies, never references into
//!   registry state
//! - **Maintenance ticker**: a periodic idle pass that reports, and optionally
//!   evicts, idle resources

use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::RegistryError;
use super::resource::ManagedResource;
use super::stats::ResourceTypeStats;
use crate::config::{ConfigurationError, RegistryConfig};
use crate::constants::ResourceKind;
use crate::logging::log_error;

#[derive(Default)]
struct RegistryState {
    resources: HashMap<String, Arc<dyn ManagedResource>>,
    stats: HashMap<ResourceKind, ResourceTypeStats>,
}

struct MaintenanceTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// IDs found idle (inactive, or unused for longer than `max_idle_time`)
    pub idle: Vec<String>,
    /// How many of those were unregistered
    pub evicted: usize,
}

/// Registry of managed resources with a global capacity
pub struct ResourceRegistry {
    config: RegistryConfig,
    state: RwLock<RegistryState>,
    shutdown: AtomicBool,
    maintenance: Mutex<Option<MaintenanceTask>>,
}

impl ResourceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        info!(
            max_resources = config.max_resources,
            cleanup_interval_ms = config.cleanup_interval_ms,
            "📚 REGISTRY: Created resource registry"
        );
        Self {
            config,
            state: RwLock::new(RegistryState::default()),
            shutdown: AtomicBool::new(false),
            maintenance: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Track a resource
    ///
    /// Fails without touching stats when the ID is taken or the registry is full.
    pub fn register(&self, resource: Arc<dyn ManagedResource>) -> Result<(), RegistryError> {
        if self.is_shutdown() {
            return Err(RegistryError::ShutDown);
        }

        let id = resource.id().to_string();
        let kind = resource.kind();
        {
            let mut state = self.state.write();
            if state.resources.contains_key(&id) {
                return Err(RegistryError::AlreadyExists { id });
            }
            if state.resources.len() >= self.config.max_resources {
                return Err(RegistryError::CapacityExceeded {
                    max: self.config.max_resources,
                });
            }
            state.resources.insert(id.clone(), resource);
            state.stats.entry(kind).or_default().record_registered();
        }

        debug!(resource_id = %id, kind = %kind, "📚 REGISTRY: Registered resource");
        Ok(())
    }

    /// Remove a resource, running its cleanup first
    ///
    /// The resource is gone from the registry even when cleanup fails; the
    /// failure is still returned to the caller.
    pub async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        let resource = {
            let mut state = self.state.write();
            let resource = state
                .resources
                .remove(id)
                .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
            state
                .stats
                .entry(resource.kind())
                .or_default()
                .record_removed();
            resource
        };

        let outcome = self.run_cleanup(resource.as_ref()).await;
        self.state
            .write()
            .stats
            .entry(resource.kind())
            .or_default()
            .record_cleanup(outcome.is_ok());

        match outcome {
            Ok(()) => {
                debug!(resource_id = %id, "📚 REGISTRY: Unregistered resource");
                Ok(())
            }
            Err(source) => {
                warn!(
                    resource_id = %id,
                    error = %source,
                    "⚠️ REGISTRY: Resource cleanup failed during unregister"
                );
                Err(RegistryError::CleanupFailed {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ManagedResource>, RegistryError> {
        self.state
            .read()
            .resources
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// All registered resources of one kind, ordered by ID
    pub fn by_type(&self, kind: ResourceKind) -> Vec<Arc<dyn ManagedResource>> {
        let state = self.state.read();
        let mut resources: Vec<_> = state
            .resources
            .values()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.id().cmp(b.id()));
        resources
    }

    /// Copy of the per-kind statistics
    pub fn stats(&self) -> HashMap<ResourceKind, ResourceTypeStats> {
        self.state.read().stats.clone()
    }

    pub fn stats_for(&self, kind: ResourceKind) -> ResourceTypeStats {
        self.state
            .read()
            .stats
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().resources.is_empty()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Clean up every resource and empty the registry
    ///
    /// Every cleanup runs even if some fail; failures are aggregated.
    /// Cumulative counters survive, active counts drop to zero.
    pub async fn cleanup_all(&self) -> Result<(), RegistryError> {
        let drained: Vec<Arc<dyn ManagedResource>> = {
            let mut state = self.state.write();
            let drained = state.resources.drain().map(|(_, r)| r).collect();
            for stats in state.stats.values_mut() {
                stats.active = 0;
            }
            drained
        };

        if drained.is_empty() {
            return Ok(());
        }

        info!(count = drained.len(), "🧹 REGISTRY: Cleaning up all resources");

        let outcomes = join_all(drained.iter().map(|resource| async move {
            let outcome = self.run_cleanup(resource.as_ref()).await;
            (resource, outcome)
        }))
        .await;

        let mut failures = Vec::new();
        {
            let mut state = self.state.write();
            for (resource, outcome) in &outcomes {
                let stats = state.stats.entry(resource.kind()).or_default();
                stats.record_cleanup(outcome.is_ok());
                if let Err(e) = outcome {
                    failures.push(format!("{}: {e}", resource.id()));
                }
            }
        }

        if failures.is_empty() {
            info!(cleaned = outcomes.len(), "✅ REGISTRY: All resources cleaned up");
            Ok(())
        } else {
            warn!(
                cleaned = outcomes.len() - failures.len(),
                failed = failures.len(),
                "⚠️ REGISTRY: Some resources failed to clean up"
            );
            for failure in &failures {
                log_error("registry", "cleanup_all", failure, None);
            }
            Err(RegistryError::CleanupErrors { failures })
        }
    }

    /// Stop maintenance and clean up everything; later calls are no-ops
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("📚 REGISTRY: Shutdown already performed");
            return Ok(());
        }

        info!("🛑 REGISTRY: Shutting down");
        self.stop_maintenance().await;
        self.cleanup_all().await
    }

    /// Start the periodic maintenance ticker
    ///
    /// The task holds only a weak reference, so dropping the last `Arc`
    /// ends it as well. Calling this twice keeps the first ticker. A zero
    /// `cleanup_interval_ms` is rejected before anything is spawned.
    pub fn start_maintenance(self: &Arc<Self>) -> Result<(), RegistryError> {
        if self.config.cleanup_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "registry.cleanup_interval_ms",
                "0",
                "maintenance interval must be positive",
            )
            .into());
        }

        let mut slot = self.maintenance.lock();
        if slot.is_some() || self.is_shutdown() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let child = token.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.cleanup_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(registry) = weak.upgrade() else {
                    break;
                };
                registry.maintenance_pass().await;
            }
            debug!("📚 REGISTRY: Maintenance ticker stopped");
        });

        *slot = Some(MaintenanceTask { token, handle });
        debug!(interval_ms = self.config.cleanup_interval_ms, "📚 REGISTRY: Maintenance started");
        Ok(())
    }

    async fn stop_maintenance(&self) {
        let task = self.maintenance.lock().take();
        if let Some(task) = task {
            task.token.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "⚠️ REGISTRY: Maintenance task ended abnormally");
            }
        }
    }

    /// Find idle resources and, when `evict_idle` is set, unregister them
    pub async fn maintenance_pass(&self) -> MaintenanceReport {
        let max_idle = chrono::Duration::from_std(self.config.max_idle_time())
            .unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();

        let mut idle: Vec<String> = {
            let state = self.state.read();
            state
                .resources
                .values()
                .filter(|r| !r.is_active() || now - r.last_used() > max_idle)
                .map(|r| r.id().to_string())
                .collect()
        };
        idle.sort();

        let mut evicted = 0;
        if self.config.evict_idle {
            for id in &idle {
                match self.unregister(id).await {
                    Ok(()) => evicted += 1,
                    Err(RegistryError::NotFound { .. }) => {}
                    Err(e) => {
                        evicted += 1;
                        warn!(resource_id = %id, error = %e, "⚠️ REGISTRY: Idle eviction cleanup failed");
                    }
                }
            }
        }

        if !idle.is_empty() {
            debug!(
                idle = idle.len(),
                evicted = evicted,
                "📚 REGISTRY: Maintenance pass found idle resources"
            );
        }

        MaintenanceReport { idle, evicted }
    }

    async fn run_cleanup(&self, resource: &dyn ManagedResource) -> anyhow::Result<()> {
        let timeout: Duration = self.config.resource_timeout();
        match tokio::time::timeout(timeout, resource.cleanup()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("cleanup timed out after {timeout:?}")),
        }
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        if let Some(task) = self.maintenance.get_mut().take() {
            task.token.cancel();
        }
    }
}
