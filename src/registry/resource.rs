//! Managed resource capability exposed to the registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::constants::ResourceKind;

/// A resource whose lifecycle the [`ResourceRegistry`](super::ResourceRegistry) tracks
///
/// Implemented by backends: browser sessions, database connection wrappers,
/// HTTP client wrappers, and whole pools via
/// [`ManagedPool`](crate::pool::ManagedPool).
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Registry-unique identifier
    fn id(&self) -> &str;

    fn kind(&self) -> ResourceKind;

    fn created_at(&self) -> DateTime<Utc>;

    fn last_used(&self) -> DateTime<Utc>;

    /// Whether the resource is currently doing work
    fn is_active(&self) -> bool;

    /// Release whatever the resource holds
    async fn cleanup(&self) -> anyhow::Result<()>;
}
