//! # Structured Logging Module
//!
//! Environment-aware structured logging for debugging concurrent pool,
//! cleanup and workflow activity.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once and safe to call when the host application has
/// already installed a global subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = wants_json_output();

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let console = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("GAUNTLET_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

fn wants_json_output() -> bool {
    std::env::var("GAUNTLET_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for pool operations
pub fn log_pool_operation(
    operation: &str,
    pool: &str,
    status: &str,
    in_use: usize,
    available: usize,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        pool = %pool,
        status = %status,
        in_use = in_use,
        available = available,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🏊 POOL_OPERATION"
    );
}

/// Log structured data for cleanup runs
pub fn log_cleanup_operation(
    operation: &str,
    total: usize,
    successful: usize,
    failed: usize,
    duration_ms: u64,
) {
    tracing::info!(
        operation = %operation,
        total = total,
        successful = successful,
        failed = failed,
        duration_ms = duration_ms,
        timestamp = %Utc::now().to_rfc3339(),
        "🧹 CLEANUP_OPERATION"
    );
}

/// Log structured data for workflow executions
pub fn log_workflow_operation(
    operation: &str,
    workflow: &str,
    execution_id: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        workflow = %workflow,
        execution_id = %execution_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔀 WORKFLOW_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_error("logging", "test", "sample error", None);
    }
}
