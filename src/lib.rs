#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, WebDriver in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Gauntlet Core
//!
//! Concurrent resource-lifecycle and orchestration engine for a multi-backend
//! test-automation framework (UI, HTTP API, database, mobile).
//!
//! ## Overview
//!
//! Browser driving, HTTP request construction and SQL execution live in
//! collaborator crates behind narrow traits. This crate owns what sits
//! between them: bounded resource pools, resource bookkeeping, ordered
//! teardown, bounded-concurrency scheduling of tests, and multi-step
//! workflows with rollback.
//!
//! ## Module Organization
//!
//! - [`pool`] - Generic bounded pools with health checks, timeouts and cancellation
//! - [`registry`] - Global resource registry with per-kind lifecycle statistics
//! - [`cleanup`] - Priority-ordered teardown callbacks with per-task timeouts
//! - [`execution`] - Bounded parallel executor for test units
//! - [`workflow`] - Multi-backend workflows with failure capture and rollback
//! - [`config`] - Layered configuration (TOML files + environment)
//! - [`logging`] - Structured logging setup
//! - [`engine`] - `GauntletCore`, the handle owning registry, cleanup and executor
//! - [`error`] - Crate-wide error type
//!
//! ## Data Flow
//!
//! ```text
//! test run ──acquire/release──▶ ResourcePool ◀──tracked by── ResourceRegistry
//!    │                                                            ▲
//!    └─runs under─▶ BoundedParallelExecutor ──units──▶ WorkflowOrchestrator
//!                                                                  │
//! CleanupCoordinator ◀──────── shutdown / suite completion ────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gauntlet_core::config::ConfigManager;
//! use gauntlet_core::GauntletCore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! gauntlet_core::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let core = GauntletCore::from_manager(&manager)?;
//!
//! core.cleanup().register("flush-reports", 10, |_cancel| async { Ok(()) });
//!
//! let metrics = core.shutdown().await?;
//! println!("cleanup ran {} task(s)", metrics.total_tasks);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Cancellation is cooperative throughout. Timed-out cleanup callbacks and
//! test units are reported as failed/errored and their tokens cancelled,
//! but code that never observes its token keeps running in the background.

pub mod cleanup;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod execution;
pub mod logging;
pub mod pool;
pub mod registry;
pub mod workflow;

pub use cleanup::{CleanupCoordinator, CleanupMetrics};
pub use config::{ConfigManager, GauntletConfig};
pub use constants::{Backend, ExecutionStatus, ResourceKind};
pub use engine::GauntletCore;
pub use error::{GauntletError, Result};
pub use execution::{AggregateResult, BoundedParallelExecutor, ExecutionResult, ExecutionUnit};
pub use pool::{PoolError, PooledResource, ResourceFactory, ResourcePool};
pub use registry::{ManagedResource, ResourceRegistry, ResourceTypeStats};
pub use workflow::{Workflow, WorkflowOrchestrator, WorkflowResult, WorkflowStep};
