//! # Gauntlet Engine
//!
//! One handle owning the long-lived engine components built from a single
//! [`GauntletConfig`]: the resource registry, the cleanup coordinator and the
//! parallel executor. Pools and workflow orchestrators are created through it
//! so they share that configuration and bookkeeping.
//!
//! Shutdown order is fixed: queued cleanup tasks first (they may still need
//! registered resources), then the registry, then the executor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::cleanup::{CleanupCoordinator, CleanupMetrics};
use crate::config::{ConfigManager, GauntletConfig};
use crate::error::{GauntletError, Result};
use crate::execution::{AggregateResult, BoundedParallelExecutor, ExecutionUnit};
use crate::logging::{log_error, log_pool_operation};
use crate::pool::{ManagedPool, ResourceFactory, ResourcePool};
use crate::registry::ResourceRegistry;
use crate::workflow::{BackendSet, WorkflowOrchestrator};

pub struct GauntletCore {
    config: GauntletConfig,
    registry: Arc<ResourceRegistry>,
    cleanup: Arc<CleanupCoordinator>,
    executor: Arc<BoundedParallelExecutor>,
    shutdown: AtomicBool,
}

impl GauntletCore {
    /// Build every component from a validated configuration
    ///
    /// The registry's maintenance ticker is started when called inside a
    /// tokio runtime.
    pub fn from_config(config: GauntletConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ResourceRegistry::new(config.registry.clone()));
        let cleanup = Arc::new(CleanupCoordinator::new(config.cleanup.clone()));
        let executor = Arc::new(BoundedParallelExecutor::new(config.executor.clone())?);

        if tokio::runtime::Handle::try_current().is_ok() {
            registry.start_maintenance()?;
        }

        info!(
            max_concurrency = config.executor.max_concurrency,
            max_resources = config.registry.max_resources,
            "✅ CORE: Gauntlet core initialized"
        );

        Ok(Self {
            config,
            registry,
            cleanup,
            executor,
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        Self::from_config(manager.config().clone())
    }

    pub fn config(&self) -> &GauntletConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn cleanup(&self) -> &Arc<CleanupCoordinator> {
        &self.cleanup
    }

    pub fn executor(&self) -> &Arc<BoundedParallelExecutor> {
        &self.executor
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Create a pool with the configured sizing and register it for cleanup
    ///
    /// Refused with [`GauntletError::InvalidState`] once the core has shut down.
    pub fn pool<F: ResourceFactory>(
        &self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<Arc<ResourcePool<F>>> {
        let name = name.into();
        if self.is_shutdown() {
            return Err(GauntletError::InvalidState(format!(
                "cannot create pool '{name}' after shutdown"
            )));
        }

        let pool = Arc::new(ResourcePool::new(name, factory, self.config.pool.clone())?);
        self.registry
            .register(Arc::new(ManagedPool::new(pool.clone())))?;

        let stats = pool.stats();
        log_pool_operation(
            "register",
            pool.name(),
            "ready",
            stats.in_use,
            stats.available,
            Some(stats.kind.as_str()),
        );
        Ok(pool)
    }

    pub fn workflow_orchestrator(&self, backends: BackendSet) -> Arc<WorkflowOrchestrator> {
        Arc::new(WorkflowOrchestrator::new(self.config.workflow.clone(), backends))
    }

    pub async fn run(&self, units: Vec<Arc<dyn ExecutionUnit>>) -> Result<AggregateResult> {
        Ok(self.executor.run(units).await?)
    }

    /// Tear everything down; later calls return empty metrics
    ///
    /// Every stage runs even if an earlier one fails. A registry cleanup
    /// failure is returned after the executor has been stopped.
    pub async fn shutdown(&self) -> Result<CleanupMetrics> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(CleanupMetrics::empty());
        }

        info!("🛑 CORE: Shutting down");
        let metrics = self.cleanup.shutdown().await;
        let registry_result = self.registry.shutdown().await;
        self.executor.shutdown().await;

        if let Err(e) = registry_result {
            log_error("core", "shutdown", &e.to_string(), Some("registry cleanup"));
            return Err(GauntletError::from(e));
        }

        info!(
            cleanup_tasks = metrics.total_tasks,
            cleanup_failures = metrics.failed_tasks,
            "✅ CORE: Shutdown complete"
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ResourceKind;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct NullFactory;

    #[async_trait]
    impl ResourceFactory for NullFactory {
        type Resource = ();

        fn kind(&self) -> ResourceKind {
            ResourceKind::Memory
        }

        async fn create(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn validate(&self, _resource: &()) -> bool {
            true
        }

        async fn close(&self, _resource: ()) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_pool_is_registered() {
        let core = GauntletCore::from_config(GauntletConfig::default()).unwrap();
        let pool = core.pool("scratch", NullFactory).unwrap();

        assert!(core.registry().get("pool:scratch").is_ok());
        assert_eq!(pool.max_size(), core.config().pool.max_size);
        assert!(matches!(
            core.pool("scratch", NullFactory),
            Err(GauntletError::Registry(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = GauntletConfig::default();
        config.pool.max_size = 0;
        assert!(GauntletCore::from_config(config).is_err());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let core = GauntletCore::from_config(GauntletConfig::default()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        core.cleanup().register("count", 1, move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let first = core.shutdown().await.unwrap();
        assert_eq!(first.successful_tasks, 1);
        let second = core.shutdown().await.unwrap();
        assert_eq!(second.total_tasks, 0);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(core.is_shutdown());
        assert!(core.registry().is_shutdown());
        assert!(core.executor().is_shutdown());
    }

    #[tokio::test]
    async fn test_pool_after_shutdown_is_invalid_state() {
        let core = GauntletCore::from_config(GauntletConfig::default()).unwrap();
        core.shutdown().await.unwrap();

        let err = core.pool("late", NullFactory).err().unwrap();
        assert!(matches!(err, GauntletError::InvalidState(_)));
        assert!(err.to_string().contains("late"));
        assert!(core.registry().is_empty());
    }
}
