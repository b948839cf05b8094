//! # Gauntlet Configuration System
//!
//! Plain option structs for every subsystem plus an environment-aware loader.
//!
//! ## Architecture
//!
//! - **Option structs**: [`PoolConfig`], [`RegistryConfig`], [`CleanupConfig`],
//!   [`ExecutorConfig`], [`WorkflowConfig`], aggregated by [`GauntletConfig`]
//! - **Explicit defaults**: every struct implements `Default`; host-derived
//!   defaults (executor concurrency) are computed by the constructor, never
//!   stored in process-wide mutable state
//! - **Layered loading**: [`ConfigManager`] merges a base TOML file, an
//!   environment overlay and `GAUNTLET__*` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gauntlet_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let pool = &manager.config().pool;
//! println!("pool size {} timeout {:?}", pool.max_size, pool.acquire_timeout());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/gauntlet.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GauntletConfig {
    pub pool: PoolConfig,
    pub registry: RegistryConfig,
    pub cleanup: CleanupConfig,
    pub executor: ExecutorConfig,
    pub workflow: WorkflowConfig,
}

impl GauntletConfig {
    /// Validate every section, reporting the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        self.pool.validate()?;
        self.registry.validate()?;
        self.cleanup.validate()?;
        self.executor.validate()?;
        self.workflow.validate()?;
        Ok(())
    }
}

fn require_positive(field: &str, value: u64, context: &str) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigurationError::invalid_value(
            field,
            value.to_string(),
            format!("{context} must be greater than zero"),
        ));
    }
    Ok(())
}

/// Resource pool settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on resources that are in use or available at once
    pub max_size: usize,
    /// How long `acquire` blocks before giving up
    pub acquire_timeout_ms: u64,
    /// Resources created eagerly by `initialize`
    pub min_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::POOL_MAX_SIZE,
            acquire_timeout_ms: defaults::POOL_ACQUIRE_TIMEOUT_MS,
            min_idle: 0,
        }
    }
}

impl PoolConfig {
    pub fn new(max_size: usize, acquire_timeout: Duration) -> Self {
        Self {
            max_size,
            acquire_timeout_ms: duration_to_ms(acquire_timeout),
            min_idle: 0,
        }
    }

    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive("pool.max_size", self.max_size as u64, "pool size")?;
        require_positive(
            "pool.acquire_timeout_ms",
            self.acquire_timeout_ms,
            "acquire timeout",
        )?;
        if self.min_idle > self.max_size {
            return Err(ConfigurationError::invalid_value(
                "pool.min_idle",
                self.min_idle.to_string(),
                format!("min_idle cannot exceed max_size ({})", self.max_size),
            ));
        }
        Ok(())
    }
}

/// Resource registry settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Global ceiling across all resource kinds
    pub max_resources: usize,
    /// Period of the maintenance ticker
    pub cleanup_interval_ms: u64,
    /// Upper bound for a single resource cleanup during shutdown
    pub resource_timeout_ms: u64,
    /// A resource unused for longer than this is considered idle
    pub max_idle_time_ms: u64,
    /// Unregister idle resources during maintenance instead of only reporting them
    pub evict_idle: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_resources: defaults::REGISTRY_MAX_RESOURCES,
            cleanup_interval_ms: defaults::REGISTRY_CLEANUP_INTERVAL_MS,
            resource_timeout_ms: defaults::REGISTRY_RESOURCE_TIMEOUT_MS,
            max_idle_time_ms: defaults::REGISTRY_MAX_IDLE_TIME_MS,
            evict_idle: false,
        }
    }
}

impl RegistryConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn resource_timeout(&self) -> Duration {
        Duration::from_millis(self.resource_timeout_ms)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_millis(self.max_idle_time_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive(
            "registry.max_resources",
            self.max_resources as u64,
            "resource ceiling",
        )?;
        require_positive(
            "registry.cleanup_interval_ms",
            self.cleanup_interval_ms,
            "cleanup interval",
        )?;
        require_positive(
            "registry.resource_timeout_ms",
            self.resource_timeout_ms,
            "resource timeout",
        )
    }
}

/// Cleanup coordinator settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Timeout applied to tasks registered without an explicit one
    pub default_timeout_ms: u64,
    /// `<= 1` runs tasks sequentially by priority
    pub max_concurrent: usize,
    /// Keep running remaining tasks after a failure
    pub continue_on_error: bool,
    /// Record per-task timings and log a summary after each run
    pub enable_metrics: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: defaults::CLEANUP_DEFAULT_TIMEOUT_MS,
            max_concurrent: defaults::CLEANUP_MAX_CONCURRENT,
            continue_on_error: true,
            enable_metrics: true,
        }
    }
}

impl CleanupConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive(
            "cleanup.default_timeout_ms",
            self.default_timeout_ms,
            "default cleanup timeout",
        )
    }
}

/// Bounded parallel executor settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Width of the concurrency semaphore
    pub max_concurrency: usize,
    /// Per-unit timeout
    pub resource_timeout_ms: u64,
    /// Wait for in-flight units to drain on shutdown
    pub graceful_shutdown: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: Self::host_concurrency(),
            resource_timeout_ms: defaults::EXECUTOR_RESOURCE_TIMEOUT_MS,
            graceful_shutdown: true,
        }
    }
}

impl ExecutorConfig {
    pub fn new(max_concurrency: usize, resource_timeout: Duration) -> Self {
        Self {
            max_concurrency,
            resource_timeout_ms: duration_to_ms(resource_timeout),
            graceful_shutdown: true,
        }
    }

    /// Detected host CPU count
    ///
    /// Used for concurrency defaults. Async units are cheap, so this bounds
    /// parallel test work rather than threads.
    pub fn host_concurrency() -> usize {
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(defaults::EXECUTOR_FALLBACK_CONCURRENCY)
    }

    pub fn resource_timeout(&self) -> Duration {
        Duration::from_millis(self.resource_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive(
            "executor.max_concurrency",
            self.max_concurrency as u64,
            "concurrency",
        )?;
        require_positive(
            "executor.resource_timeout_ms",
            self.resource_timeout_ms,
            "unit timeout",
        )
    }
}

/// Workflow orchestrator settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Timeout for steps that do not declare their own
    pub default_step_timeout_ms: u64,
    /// Ask every configured backend for a diagnostic snapshot on failure
    pub capture_backend_snapshots: bool,
    /// Bound on the per-execution log trail
    pub max_log_lines: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_step_timeout_ms: defaults::WORKFLOW_STEP_TIMEOUT_MS,
            capture_backend_snapshots: true,
            max_log_lines: defaults::WORKFLOW_MAX_LOG_LINES,
        }
    }
}

impl WorkflowConfig {
    pub fn default_step_timeout(&self) -> Duration {
        Duration::from_millis(self.default_step_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive(
            "workflow.default_step_timeout_ms",
            self.default_step_timeout_ms,
            "step timeout",
        )
    }
}

/// Milliseconds for a `*_ms` field, saturating at `u64::MAX`
fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GauntletConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.max_size, defaults::POOL_MAX_SIZE);
        assert!(config.cleanup.continue_on_error);
        assert!(config.executor.max_concurrency >= 1);
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let config = PoolConfig::new(0, Duration::from_secs(1));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pool.max_size"));
    }

    #[test]
    fn test_min_idle_cannot_exceed_max_size() {
        let config = PoolConfig::new(2, Duration::from_secs(1)).with_min_idle(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let config = PoolConfig::new(4, Duration::from_millis(1500));
        assert_eq!(config.acquire_timeout(), Duration::from_millis(1500));

        let executor = ExecutorConfig::new(2, Duration::from_secs(3));
        assert_eq!(executor.resource_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let json = serde_json::json!({ "pool": { "max_size": 3 } });
        let config: GauntletConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.pool.max_size, 3);
        assert_eq!(
            config.pool.acquire_timeout_ms,
            defaults::POOL_ACQUIRE_TIMEOUT_MS
        );
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn test_huge_durations_saturate() {
        let pool = PoolConfig::new(1, Duration::MAX);
        assert_eq!(pool.acquire_timeout_ms, u64::MAX);

        let executor = ExecutorConfig::new(1, Duration::MAX);
        assert_eq!(executor.resource_timeout_ms, u64::MAX);

        let exact = PoolConfig::new(1, Duration::from_millis(1_500));
        assert_eq!(exact.acquire_timeout_ms, 1_500);
    }
}
