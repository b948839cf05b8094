//! Prioritised teardown callbacks.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) type CleanupCallback =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A named teardown callback with a priority and timeout
///
/// Higher priorities run first. The callback receives a token that is
/// cancelled when its timeout expires; honouring it is up to the callback.
pub struct CleanupTask {
    name: String,
    priority: i32,
    timeout: Duration,
    callback: CleanupCallback,
}

impl CleanupTask {
    pub fn new<F, Fut>(name: impl Into<String>, priority: i32, timeout: Duration, callback: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            timeout,
            callback: Box::new(move |token: CancellationToken| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(callback(token))
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn into_parts(self) -> (String, i32, Duration, CleanupCallback) {
        (self.name, self.priority, self.timeout, self.callback)
    }
}

impl fmt::Debug for CleanupTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupTask")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Insert keeping descending priority; equal priorities keep insertion order
pub(crate) fn insert_by_priority(tasks: &mut Vec<CleanupTask>, task: CleanupTask) {
    let position = tasks.partition_point(|queued| queued.priority >= task.priority);
    tasks.insert(position, task);
}
