//! Workflow steps, actions and validations.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::backends::{ApiResponse, QueryResult};
use crate::constants::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiAction {
    Navigate { url: String },
    Click { selector: String },
    Type { selector: String, text: String },
}

/// What a step asks its backend to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StepAction {
    Ui(UiAction),
    Api {
        method: HttpMethod,
        endpoint: String,
        body: Option<Value>,
        headers: HashMap<String, String>,
    },
    Database {
        connection: String,
        query: String,
        args: Vec<Value>,
    },
}

impl StepAction {
    pub fn backend(&self) -> Backend {
        match self {
            StepAction::Ui(_) => Backend::Ui,
            StepAction::Api { .. } => Backend::Api,
            StepAction::Database { .. } => Backend::Database,
        }
    }

    /// Diagnostic description of the request, captured on failure
    pub fn describe(&self) -> Value {
        match self {
            StepAction::Ui(action) => json!({ "ui": action }),
            StepAction::Api {
                method,
                endpoint,
                body,
                headers,
            } => json!({
                "method": method.as_str(),
                "endpoint": endpoint,
                "headers": headers,
                "body": body,
            }),
            StepAction::Database {
                connection,
                query,
                args,
            } => json!({
                "connection": connection,
                "query": query,
                "args": args,
            }),
        }
    }
}

/// What a backend returned for a step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Ui,
    Api(ApiResponse),
    Database(QueryResult),
}

type Predicate = Arc<dyn Fn(&StepOutput) -> bool + Send + Sync>;

/// An assertion over a step's output
#[derive(Clone)]
pub enum StepValidation {
    /// Expected HTTP status code
    Status(u16),
    /// Response body must contain the string
    BodyContains(String),
    /// Exact number of rows affected by a statement
    RowsAffected(u64),
    Custom {
        description: String,
        check: Predicate,
    },
}

impl StepValidation {
    pub fn custom<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&StepOutput) -> bool + Send + Sync + 'static,
    {
        StepValidation::Custom {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// `Err` carries the assertion message
    pub fn check(&self, output: &StepOutput) -> Result<(), String> {
        match (self, output) {
            (StepValidation::Status(expected), StepOutput::Api(response)) => {
                if response.status == *expected {
                    Ok(())
                } else {
                    Err(format!(
                        "expected status {expected}, got {}",
                        response.status
                    ))
                }
            }
            (StepValidation::BodyContains(needle), StepOutput::Api(response)) => {
                if response.body.contains(needle.as_str()) {
                    Ok(())
                } else {
                    Err(format!("response body does not contain {needle:?}"))
                }
            }
            (StepValidation::RowsAffected(expected), StepOutput::Database(result)) => {
                if result.rows_affected == *expected {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {expected} row(s) affected, got {}",
                        result.rows_affected
                    ))
                }
            }
            (StepValidation::Custom { description, check }, output) => {
                if check(output) {
                    Ok(())
                } else {
                    Err(format!("custom validation failed: {description}"))
                }
            }
            (validation, _) => Err(format!(
                "{validation:?} cannot be applied to this step's output"
            )),
        }
    }
}

impl fmt::Debug for StepValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepValidation::Status(code) => f.debug_tuple("Status").field(code).finish(),
            StepValidation::BodyContains(s) => f.debug_tuple("BodyContains").field(s).finish(),
            StepValidation::RowsAffected(n) => f.debug_tuple("RowsAffected").field(n).finish(),
            StepValidation::Custom { description, .. } => f
                .debug_struct("Custom")
                .field("description", description)
                .finish_non_exhaustive(),
        }
    }
}

/// One step of a multi-backend scenario
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    pub name: String,
    pub action: StepAction,
    pub validations: Vec<StepValidation>,
    /// Per-attempt timeout; the orchestrator default applies when unset
    pub timeout: Option<Duration>,
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Compensating action run during rollback if a later step fails
    pub compensation: Option<StepAction>,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            validations: Vec::new(),
            timeout: None,
            retries: 0,
            compensation: None,
        }
    }

    pub fn navigate(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, StepAction::Ui(UiAction::Navigate { url: url.into() }))
    }

    pub fn click(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(
            name,
            StepAction::Ui(UiAction::Click {
                selector: selector.into(),
            }),
        )
    }

    pub fn type_text(
        name: impl Into<String>,
        selector: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StepAction::Ui(UiAction::Type {
                selector: selector.into(),
                text: text.into(),
            }),
        )
    }

    pub fn api(name: impl Into<String>, method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self::new(
            name,
            StepAction::Api {
                method,
                endpoint: endpoint.into(),
                body: None,
                headers: HashMap::new(),
            },
        )
    }

    pub fn query(
        name: impl Into<String>,
        connection: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StepAction::Database {
                connection: connection.into(),
                query: query.into(),
                args: Vec::new(),
            },
        )
    }

    /// Request body; ignored for non-API steps
    pub fn with_body(mut self, value: Value) -> Self {
        if let StepAction::Api { body, .. } = &mut self.action {
            *body = Some(value);
        }
        self
    }

    /// Request header; ignored for non-API steps
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let StepAction::Api { headers, .. } = &mut self.action {
            headers.insert(key.into(), value.into());
        }
        self
    }

    /// Query arguments; ignored for non-database steps
    pub fn with_args(mut self, values: Vec<Value>) -> Self {
        if let StepAction::Database { args, .. } = &mut self.action {
            *args = values;
        }
        self
    }

    pub fn expect(mut self, validation: StepValidation) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_compensation(mut self, action: StepAction) -> Self {
        self.compensation = Some(action);
        self
    }

    pub fn backend(&self) -> Backend {
        self.action.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> StepOutput {
        StepOutput::Api(ApiResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
        })
    }

    #[test]
    fn test_builders_set_backend() {
        assert_eq!(WorkflowStep::navigate("home", "/").backend(), Backend::Ui);
        assert_eq!(
            WorkflowStep::api("create", HttpMethod::Post, "/users").backend(),
            Backend::Api
        );
        assert_eq!(
            WorkflowStep::query("count", "primary", "SELECT 1").backend(),
            Backend::Database
        );
    }

    #[test]
    fn test_api_modifiers_only_touch_api_steps() {
        let step = WorkflowStep::api("create", HttpMethod::Post, "/users")
            .with_body(json!({"name": "ada"}))
            .with_header("X-Trace", "1");
        match &step.action {
            StepAction::Api { body, headers, .. } => {
                assert_eq!(body.as_ref().unwrap()["name"], "ada");
                assert_eq!(headers["X-Trace"], "1");
            }
            other => panic!("unexpected action {other:?}"),
        }

        let ui = WorkflowStep::click("btn", "#go").with_body(json!(1));
        assert!(matches!(ui.action, StepAction::Ui(UiAction::Click { .. })));
    }

    #[test]
    fn test_status_and_body_validations() {
        assert!(StepValidation::Status(200).check(&response(200, "")).is_ok());
        let err = StepValidation::Status(201)
            .check(&response(500, ""))
            .unwrap_err();
        assert!(err.contains("expected status 201, got 500"));

        assert!(StepValidation::BodyContains("ok".into())
            .check(&response(200, "status: ok"))
            .is_ok());
        assert!(StepValidation::BodyContains("ok".into())
            .check(&response(200, "nope"))
            .is_err());
    }

    #[test]
    fn test_rows_affected_and_mismatched_output() {
        let output = StepOutput::Database(QueryResult {
            rows_affected: 3,
            rows: Vec::new(),
        });
        assert!(StepValidation::RowsAffected(3).check(&output).is_ok());
        assert!(StepValidation::RowsAffected(1).check(&output).is_err());
        assert!(StepValidation::Status(200).check(&output).is_err());
    }

    #[test]
    fn test_custom_validation() {
        let validation = StepValidation::custom("ui only", |output| matches!(output, StepOutput::Ui));
        assert!(validation.check(&StepOutput::Ui).is_ok());
        let err = validation.check(&response(200, "")).unwrap_err();
        assert!(err.contains("ui only"));
    }

    #[test]
    fn test_describe_api_action() {
        let step = WorkflowStep::api("create", HttpMethod::Put, "/users/1").with_body(json!({"a": 1}));
        let described = step.action.describe();
        assert_eq!(described["method"], "PUT");
        assert_eq!(described["endpoint"], "/users/1");
        assert_eq!(described["body"]["a"], 1);
    }
}
