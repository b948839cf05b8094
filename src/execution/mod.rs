//! # Parallel Test Execution
//!
//! [`BoundedParallelExecutor`] runs batches of [`ExecutionUnit`]s under a
//! concurrency ceiling with per-unit timeouts and cooperative cancellation,
//! and folds their [`ExecutionResult`]s into an [`AggregateResult`].

pub mod aggregate;
pub mod error;
pub mod executor;
pub mod unit;

pub use aggregate::{AggregateResult, Summary};
pub use error::ExecutorError;
pub use executor::BoundedParallelExecutor;
pub use unit::{ExecutionResult, ExecutionUnit};
