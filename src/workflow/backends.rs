//! Backend collaborators and dispatch.
//!
//! The orchestrator never talks to a browser, HTTP server or database
//! itself. It hands each step to one of the collaborator traits below,
//! chosen by the step's [`Backend`] tag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::WorkflowError;
use super::step::{HttpMethod, StepAction, StepOutput, UiAction};
use crate::constants::Backend;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows_affected: u64,
    pub rows: Vec<Value>,
}

/// Browser driver
#[async_trait]
pub trait UiBackend: Send + Sync {
    async fn navigate(&self, url: &str) -> anyhow::Result<()>;

    async fn click(&self, selector: &str) -> anyhow::Result<()>;

    async fn type_text(&self, selector: &str, text: &str) -> anyhow::Result<()>;

    /// Diagnostic state captured when a workflow fails (URL, DOM excerpt, ...)
    async fn snapshot(&self) -> Option<Value> {
        None
    }
}

/// HTTP client
#[async_trait]
pub trait ApiBackend: Send + Sync {
    async fn get(
        &self,
        endpoint: &str,
        headers: &HashMap<String, String>,
    ) -> anyhow::Result<ApiResponse>;

    async fn post(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        headers: &HashMap<String, String>,
    ) -> anyhow::Result<ApiResponse>;

    async fn put(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        headers: &HashMap<String, String>,
    ) -> anyhow::Result<ApiResponse>;

    async fn delete(
        &self,
        endpoint: &str,
        headers: &HashMap<String, String>,
    ) -> anyhow::Result<ApiResponse>;

    async fn snapshot(&self) -> Option<Value> {
        None
    }
}

/// SQL executor
#[async_trait]
pub trait DbBackend: Send + Sync {
    async fn execute(
        &self,
        connection: &str,
        query: &str,
        args: &[Value],
    ) -> anyhow::Result<QueryResult>;

    async fn snapshot(&self) -> Option<Value> {
        None
    }
}

/// The backends available to a workflow, keyed by tag
#[derive(Clone, Default)]
pub struct BackendSet {
    ui: Option<Arc<dyn UiBackend>>,
    api: Option<Arc<dyn ApiBackend>>,
    database: Option<Arc<dyn DbBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ui(mut self, backend: Arc<dyn UiBackend>) -> Self {
        self.ui = Some(backend);
        self
    }

    pub fn with_api(mut self, backend: Arc<dyn ApiBackend>) -> Self {
        self.api = Some(backend);
        self
    }

    pub fn with_database(mut self, backend: Arc<dyn DbBackend>) -> Self {
        self.database = Some(backend);
        self
    }

    pub fn supports(&self, backend: Backend) -> bool {
        match backend {
            Backend::Ui => self.ui.is_some(),
            Backend::Api => self.api.is_some(),
            Backend::Database => self.database.is_some(),
        }
    }

    /// Run an action with a per-attempt timeout, retrying up to `retries` more times
    pub async fn perform(
        &self,
        action: &StepAction,
        timeout: Duration,
        retries: u32,
    ) -> Result<StepOutput, WorkflowError> {
        let backend = action.backend();
        if !self.supports(backend) {
            return Err(WorkflowError::BackendUnavailable { backend });
        }

        let attempts = retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match tokio::time::timeout(timeout, self.dispatch(action)).await {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(source)) => WorkflowError::ActionFailed {
                    backend,
                    attempts: attempt,
                    source,
                },
                Err(_) => WorkflowError::ActionTimedOut { backend, timeout },
            };

            if attempt >= attempts {
                return Err(error);
            }
            warn!(
                backend = %backend,
                attempt = attempt,
                max_attempts = attempts,
                error = %error,
                "🔀 WORKFLOW: Backend action failed, retrying"
            );
        }
    }

    /// Diagnostic snapshots from every configured backend that provides one
    pub async fn snapshots(&self) -> HashMap<Backend, Value> {
        let mut snapshots = HashMap::new();
        if let Some(ui) = &self.ui {
            if let Some(snapshot) = ui.snapshot().await {
                snapshots.insert(Backend::Ui, snapshot);
            }
        }
        if let Some(api) = &self.api {
            if let Some(snapshot) = api.snapshot().await {
                snapshots.insert(Backend::Api, snapshot);
            }
        }
        if let Some(database) = &self.database {
            if let Some(snapshot) = database.snapshot().await {
                snapshots.insert(Backend::Database, snapshot);
            }
        }
        snapshots
    }

    async fn dispatch(&self, action: &StepAction) -> anyhow::Result<StepOutput> {
        match action {
            StepAction::Ui(ui_action) => {
                let ui = self.ui.as_ref().ok_or_else(|| anyhow::anyhow!("no ui backend"))?;
                match ui_action {
                    UiAction::Navigate { url } => ui.navigate(url).await?,
                    UiAction::Click { selector } => ui.click(selector).await?,
                    UiAction::Type { selector, text } => ui.type_text(selector, text).await?,
                }
                Ok(StepOutput::Ui)
            }
            StepAction::Api {
                method,
                endpoint,
                body,
                headers,
            } => {
                let api = self
                    .api
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("no api backend"))?;
                debug!(method = %method, endpoint = %endpoint, "🔀 WORKFLOW: API request");
                let response = match method {
                    HttpMethod::Get => api.get(endpoint, headers).await?,
                    HttpMethod::Post => api.post(endpoint, body.as_ref(), headers).await?,
                    HttpMethod::Put => api.put(endpoint, body.as_ref(), headers).await?,
                    HttpMethod::Delete => api.delete(endpoint, headers).await?,
                };
                Ok(StepOutput::Api(response))
            }
            StepAction::Database {
                connection,
                query,
                args,
            } => {
                let database = self
                    .database
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("no database backend"))?;
                let result = database.execute(connection, query, args).await?;
                Ok(StepOutput::Database(result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyApi {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl ApiBackend for FlakyApi {
        async fn get(
            &self,
            _endpoint: &str,
            _headers: &HashMap<String, String>,
        ) -> anyhow::Result<ApiResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                anyhow::bail!("connection reset");
            }
            Ok(ApiResponse {
                status: 200,
                ..ApiResponse::default()
            })
        }

        async fn post(
            &self,
            endpoint: &str,
            _body: Option<&Value>,
            headers: &HashMap<String, String>,
        ) -> anyhow::Result<ApiResponse> {
            self.get(endpoint, headers).await
        }

        async fn put(
            &self,
            endpoint: &str,
            _body: Option<&Value>,
            headers: &HashMap<String, String>,
        ) -> anyhow::Result<ApiResponse> {
            self.get(endpoint, headers).await
        }

        async fn delete(
            &self,
            endpoint: &str,
            headers: &HashMap<String, String>,
        ) -> anyhow::Result<ApiResponse> {
            self.get(endpoint, headers).await
        }

        async fn snapshot(&self) -> Option<Value> {
            Some(serde_json::json!({ "calls": self.calls.load(Ordering::SeqCst) }))
        }
    }

    fn get_action() -> StepAction {
        StepAction::Api {
            method: HttpMethod::Get,
            endpoint: "/health".to_string(),
            body: None,
            headers: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_backend_is_unavailable() {
        let backends = BackendSet::new();
        let err = backends
            .perform(&get_action(), Duration::from_secs(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::BackendUnavailable {
                backend: Backend::Api
            }
        ));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let api = Arc::new(FlakyApi {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let backends = BackendSet::new().with_api(api.clone());

        let output = backends
            .perform(&get_action(), Duration::from_secs(1), 2)
            .await
            .unwrap();
        assert!(matches!(output, StepOutput::Api(ApiResponse { status: 200, .. })));
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_reports_attempts() {
        let api = Arc::new(FlakyApi {
            calls: AtomicU32::new(0),
            fail_first: 10,
        });
        let backends = BackendSet::new().with_api(api);

        let err = backends
            .perform(&get_action(), Duration::from_secs(1), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ActionFailed { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_snapshots_only_from_configured_backends() {
        let api = Arc::new(FlakyApi {
            calls: AtomicU32::new(0),
            fail_first: 0,
        });
        let backends = BackendSet::new().with_api(api);
        let snapshots = backends.snapshots().await;
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots.contains_key(&Backend::Api));
    }
}
