//! # Cleanup Coordination
//!
//! Named, prioritised, timeout-bounded teardown callbacks executed at the end
//! of a test, a suite, or the process.
//!
//! ```rust
//! use gauntlet_core::cleanup::CleanupCoordinator;
//! use gauntlet_core::config::CleanupConfig;
//!
//! # tokio_test::block_on(async {
//! let coordinator = CleanupCoordinator::new(CleanupConfig::default());
//! coordinator.register("close-browsers", 100, |_cancel| async { Ok(()) });
//! coordinator.register("drop-test-schema", 10, |_cancel| async { Ok(()) });
//!
//! let metrics = coordinator.shutdown().await;
//! assert_eq!(metrics.total_tasks, 2);
//! # });
//! ```

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod task;

pub use coordinator::CleanupCoordinator;
pub use error::CleanupError;
pub use metrics::{CleanupMetrics, CleanupTaskRecord};
pub use task::CleanupTask;
