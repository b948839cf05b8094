//! # Multi-Backend Workflows
//!
//! Ordered scenarios spanning UI, API and database backends, with failure
//! capture, reverse-order rollback of compensating actions, and teardown
//! that always runs exactly once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let workflow = Workflow::new("signup")
//!     .setup(|| async { seed_fixtures().await })
//!     .step(
//!         WorkflowStep::api("create-user", HttpMethod::Post, "/users")
//!             .with_body(json!({ "email": "ada@example.test" }))
//!             .expect(StepValidation::Status(201))
//!             .with_compensation(delete_user_action()),
//!     )
//!     .step(
//!         WorkflowStep::query("user-row", "primary", "SELECT 1 FROM users WHERE email = $1")
//!             .with_args(vec![json!("ada@example.test")])
//!             .expect(StepValidation::RowsAffected(1)),
//!     )
//!     .teardown(|| async { truncate_tables().await });
//!
//! let orchestrator = WorkflowOrchestrator::new(config, backends);
//! let result = orchestrator.execute(&workflow).await;
//! ```

pub mod backends;
pub mod error;
pub mod failure;
pub mod orchestrator;
pub mod step;
pub mod unit;

pub use backends::{ApiBackend, ApiResponse, BackendSet, DbBackend, QueryResult, UiBackend};
pub use error::WorkflowError;
pub use failure::FailureContext;
pub use orchestrator::{
    RollbackRecord, StepRecord, Workflow, WorkflowOrchestrator, WorkflowPhase, WorkflowResult,
};
pub use step::{HttpMethod, StepAction, StepOutput, StepValidation, UiAction, WorkflowStep};
pub use unit::WorkflowUnit;
