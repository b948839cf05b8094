//! Registry adapter for whole pools.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::resource_pool::ResourcePool;
use super::resource::ResourceFactory;
use crate::constants::ResourceKind;
use crate::registry::ManagedResource;

/// Exposes a [`ResourcePool`] to the [`ResourceRegistry`](crate::registry::ResourceRegistry)
///
/// The pool counts as active while any of its resources are checked out.
/// Cleaning it up closes the idle resources.
pub struct ManagedPool<F: ResourceFactory> {
    id: String,
    pool: Arc<ResourcePool<F>>,
    created_at: DateTime<Utc>,
}

impl<F: ResourceFactory> ManagedPool<F> {
    /// Wrap a pool; the registry ID is `pool:<name>`
    pub fn new(pool: Arc<ResourcePool<F>>) -> Self {
        Self {
            id: format!("pool:{}", pool.name()),
            pool,
            created_at: Utc::now(),
        }
    }

    pub fn pool(&self) -> &Arc<ResourcePool<F>> {
        &self.pool
    }
}

#[async_trait]
impl<F: ResourceFactory> ManagedResource for ManagedPool<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ResourceKind {
        self.pool.kind()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn last_used(&self) -> DateTime<Utc> {
        self.pool.stats().last_activity
    }

    fn is_active(&self) -> bool {
        self.pool.stats().in_use > 0
    }

    async fn cleanup(&self) -> anyhow::Result<()> {
        self.pool.cleanup().await.map_err(anyhow::Error::from)
    }
}
