//! Executor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Concurrency must be at least 1 (requested {requested})")]
    InvalidConcurrency { requested: usize },

    #[error("Executor collected {received} of {expected} results")]
    ResultsIncomplete { expected: usize, received: usize },
}
