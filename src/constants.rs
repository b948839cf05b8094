//! # System Constants
//!
//! Closed enumerations and default values that define the operational
//! boundaries of the resource-lifecycle engine.
//!
//! Resource kinds, execution statuses and backend tags are modelled as closed
//! enums rather than free-form strings: the registry keys its statistics by
//! [`ResourceKind`] and the workflow orchestrator dispatches purely on
//! [`Backend`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default values used by the configuration structs
pub mod defaults {
    /// Maximum resources held by a single pool
    pub const POOL_MAX_SIZE: usize = 10;
    /// How long `acquire` waits before reporting a timeout
    pub const POOL_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

    /// Global ceiling across every resource type in the registry
    pub const REGISTRY_MAX_RESOURCES: usize = 1_000;
    pub const REGISTRY_CLEANUP_INTERVAL_MS: u64 = 60_000;
    pub const REGISTRY_RESOURCE_TIMEOUT_MS: u64 = 300_000;
    pub const REGISTRY_MAX_IDLE_TIME_MS: u64 = 600_000;

    pub const CLEANUP_DEFAULT_TIMEOUT_MS: u64 = 30_000;
    pub const CLEANUP_MAX_CONCURRENT: usize = 1;

    pub const EXECUTOR_RESOURCE_TIMEOUT_MS: u64 = 300_000;
    /// Used only when the host parallelism cannot be detected
    pub const EXECUTOR_FALLBACK_CONCURRENCY: usize = 4;

    pub const WORKFLOW_STEP_TIMEOUT_MS: u64 = 60_000;
    pub const WORKFLOW_MAX_LOG_LINES: usize = 500;
}

/// Kinds of resources tracked by pools and the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Browser,
    Database,
    HttpClient,
    Mobile,
    File,
    Memory,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Browser,
        ResourceKind::Database,
        ResourceKind::HttpClient,
        ResourceKind::Mobile,
        ResourceKind::File,
        ResourceKind::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Browser => "browser",
            ResourceKind::Database => "database",
            ResourceKind::HttpClient => "http_client",
            ResourceKind::Mobile => "mobile",
            ResourceKind::File => "file",
            ResourceKind::Memory => "memory",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an execution unit, a workflow, or a sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Completed and every assertion held
    Passed,
    /// A step or assertion failed, but setup/teardown completed
    Failed,
    /// Not executed
    Skipped,
    /// Infrastructure failure: setup/teardown failed, timeout, cancellation, panic
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Passed => "passed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Skipped => "skipped",
            ExecutionStatus::Error => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Passed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend a workflow step is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Ui,
    Api,
    Database,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ui => "ui",
            Backend::Api => "api",
            Backend::Database => "database",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
