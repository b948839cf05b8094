//! Mock collaborators shared by the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gauntlet_core::constants::{ExecutionStatus, ResourceKind};
use gauntlet_core::execution::{ExecutionResult, ExecutionUnit};
use gauntlet_core::pool::ResourceFactory;
use gauntlet_core::registry::ManagedResource;
use gauntlet_core::workflow::{ApiBackend, ApiResponse, DbBackend, QueryResult, UiBackend};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MockConnection {
    pub serial: u64,
    pub healthy: AtomicBool,
}

/// Factory counting creations and closes, with an optional creation delay
#[derive(Default)]
pub struct CountingFactory {
    pub created: Arc<AtomicU64>,
    pub closed: Arc<AtomicU64>,
    pub fail_create: Arc<AtomicBool>,
    pub create_delay: Duration,
}

impl CountingFactory {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            create_delay: delay,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ResourceFactory for CountingFactory {
    type Resource = Arc<MockConnection>;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Database
    }

    async fn create(&self) -> anyhow::Result<Self::Resource> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("database unreachable");
        }
        let serial = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            serial,
            healthy: AtomicBool::new(true),
        }))
    }

    async fn validate(&self, resource: &Self::Resource) -> bool {
        resource.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self, _resource: Self::Resource) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct MockResource {
    pub id: String,
    pub kind: ResourceKind,
    pub fail_cleanup: bool,
    pub cleanups: AtomicUsize,
    pub active: AtomicBool,
    pub created_at: DateTime<Utc>,
}

impl MockResource {
    pub fn new(id: &str, kind: ResourceKind) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            fail_cleanup: false,
            cleanups: AtomicUsize::new(0),
            active: AtomicBool::new(true),
            created_at: Utc::now(),
        })
    }

    pub fn failing(id: &str, kind: ResourceKind) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            fail_cleanup: true,
            cleanups: AtomicUsize::new(0),
            active: AtomicBool::new(true),
            created_at: Utc::now(),
        })
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagedResource for MockResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn last_used(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) -> anyhow::Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        if self.fail_cleanup {
            anyhow::bail!("{} refused to close", self.id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Unit that reports a fixed status after an optional delay
pub struct ScriptedUnit {
    pub name: String,
    pub status: ExecutionStatus,
    pub delay: Duration,
    pub running: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl ScriptedUnit {
    pub fn new(name: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            name: name.into(),
            status,
            delay: Duration::ZERO,
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sharing(mut self, running: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        self.running = running;
        self.peak = peak;
        self
    }

    pub fn boxed(self) -> Arc<dyn ExecutionUnit> {
        Arc::new(self)
    }
}

#[async_trait]
impl ExecutionUnit for ScriptedUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, cancel: CancellationToken) -> ExecutionResult {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let cancelled = tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.delay) => false,
        };
        self.running.fetch_sub(1, Ordering::SeqCst);

        if cancelled {
            return ExecutionResult::error(&self.name, "cancelled");
        }
        ExecutionResult::new(&self.name, self.status)
    }
}

// ---------------------------------------------------------------------------
// Workflow backends
// ---------------------------------------------------------------------------

/// Shared, ordered record of every backend call
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

pub struct RecordingUi {
    pub log: CallLog,
    pub current_url: Mutex<String>,
}

impl RecordingUi {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            current_url: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl UiBackend for RecordingUi {
    async fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.log.push(format!("ui navigate {url}"));
        *self.current_url.lock() = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str) -> anyhow::Result<()> {
        self.log.push(format!("ui click {selector}"));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> anyhow::Result<()> {
        self.log.push(format!("ui type {selector} {text}"));
        Ok(())
    }

    async fn snapshot(&self) -> Option<Value> {
        Some(json!({ "url": self.current_url.lock().clone() }))
    }
}

/// API backend answering 200 except for endpoints mapped to another status
/// or listed as failing outright
pub struct RecordingApi {
    pub log: CallLog,
    pub statuses: HashMap<String, u16>,
    pub failing: Vec<String>,
}

impl RecordingApi {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            statuses: HashMap::new(),
            failing: Vec::new(),
        }
    }

    pub fn failing_on(mut self, endpoint: &str) -> Self {
        self.failing.push(endpoint.to_string());
        self
    }

    pub fn status_for(mut self, endpoint: &str, status: u16) -> Self {
        self.statuses.insert(endpoint.to_string(), status);
        self
    }

    fn respond(&self, method: &str, endpoint: &str) -> anyhow::Result<ApiResponse> {
        self.log.push(format!("api {method} {endpoint}"));
        if self.failing.iter().any(|e| e == endpoint) {
            anyhow::bail!("connection reset by {endpoint}");
        }
        Ok(ApiResponse {
            status: self.statuses.get(endpoint).copied().unwrap_or(200),
            headers: HashMap::new(),
            body: json!({ "endpoint": endpoint }).to_string(),
        })
    }
}

#[async_trait]
impl ApiBackend for RecordingApi {
    async fn get(&self, endpoint: &str, _: &HashMap<String, String>) -> anyhow::Result<ApiResponse> {
        self.respond("GET", endpoint)
    }

    async fn post(
        &self,
        endpoint: &str,
        _: Option<&Value>,
        _: &HashMap<String, String>,
    ) -> anyhow::Result<ApiResponse> {
        self.respond("POST", endpoint)
    }

    async fn put(
        &self,
        endpoint: &str,
        _: Option<&Value>,
        _: &HashMap<String, String>,
    ) -> anyhow::Result<ApiResponse> {
        self.respond("PUT", endpoint)
    }

    async fn delete(&self, endpoint: &str, _: &HashMap<String, String>) -> anyhow::Result<ApiResponse> {
        self.respond("DELETE", endpoint)
    }
}

pub struct RecordingDb {
    pub log: CallLog,
    pub rows_affected: u64,
}

#[async_trait]
impl DbBackend for RecordingDb {
    async fn execute(&self, connection: &str, query: &str, args: &[Value]) -> anyhow::Result<QueryResult> {
        self.log
            .push(format!("db {connection} {query} ({} args)", args.len()));
        Ok(QueryResult {
            rows_affected: self.rows_affected,
            rows: Vec::new(),
        })
    }

    async fn snapshot(&self) -> Option<Value> {
        Some(json!({ "pool": "primary", "open_transactions": 0 }))
    }
}
