//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the
//! `config` crate, later sources overriding earlier ones:
//!
//! 1. `<dir>/gauntlet.toml` (optional)
//! 2. `<dir>/gauntlet.<environment>.toml` (optional)
//! 3. `GAUNTLET__<SECTION>__<FIELD>` environment variables

use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::GauntletConfig;

const BASE_FILE_STEM: &str = "gauntlet";
const ENV_PREFIX: &str = "GAUNTLET";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: GauntletConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    ///
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let explicit_dir = config_dir.is_some();
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        if explicit_dir && !config_directory.is_dir() {
            return Err(ConfigurationError::DirectoryNotFound {
                path: config_directory,
            });
        }

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            pool_max_size = config.pool.max_size,
            executor_concurrency = config.executor.max_concurrency,
            cleanup_max_concurrent = config.cleanup.max_concurrent,
            "🔧 CONFIG: Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an in-memory configuration, validating it first
    pub fn from_config(config: GauntletConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: Self::default_config_directory(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GauntletConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn build(directory: &Path, environment: &str) -> ConfigResult<GauntletConfig> {
        let base = directory.join(format!("{BASE_FILE_STEM}.toml"));
        let overlay = directory.join(format!("{BASE_FILE_STEM}.{environment}.toml"));

        let builder = Config::builder()
            .add_source(File::from(base).format(FileFormat::Toml).required(false))
            .add_source(File::from(overlay).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let merged = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        merged
            .try_deserialize::<GauntletConfig>()
            .map_err(|e| ConfigurationError::load_error(environment, e))
    }

    /// Current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("GAUNTLET_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("GAUNTLET_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
