//! # Crate Error Types
//!
//! Each subsystem owns a typed error enum so callers can tell a timeout from
//! a capacity failure from a duplicate registration. [`GauntletError`] wraps
//! them for callers that only want one error type.

use thiserror::Error;
use tokio::task::JoinError;

use crate::config::ConfigurationError;
use crate::execution::ExecutorError;
use crate::pool::PoolError;
use crate::registry::RegistryError;
use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum GauntletError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// Operation refused because the component has already shut down
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, GauntletError>;

/// Turn a failed join into a readable message, recovering the panic payload when there is one
pub(crate) fn describe_join_error(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task was cancelled".to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_describe_join_error_recovers_panic_message() {
        let handle = tokio::spawn(async {
            panic!("boom");
        });
        let err = handle.await.unwrap_err();
        assert_eq!(describe_join_error(err), "panicked: boom");
    }

    #[tokio::test]
    async fn test_describe_join_error_formatted_payload() {
        let code = 42;
        let handle = tokio::spawn(async move {
            panic!("exit code {code}");
        });
        let err = handle.await.unwrap_err();
        assert_eq!(describe_join_error(err), "panicked: exit code 42");
    }

    #[test]
    fn test_pool_error_converts() {
        let err: GauntletError = PoolError::InvalidSize {
            pool: "browsers".to_string(),
            size: 0,
        }
        .into();
        assert!(matches!(err, GauntletError::Pool(_)));
    }
}
