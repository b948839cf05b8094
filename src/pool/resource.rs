//! # Pooled Resource Capability
//!
//! The small capability a resource kind supplies to be pooled, and the handle
//! type callers hold between `acquire` and `release`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

use crate::constants::ResourceKind;

/// Creates, health-checks and closes one kind of pooled resource
///
/// Browser handles, HTTP clients and database connections all plug into the
/// same [`ResourcePool`](super::ResourcePool) through this trait.
#[async_trait]
pub trait ResourceFactory: Send + Sync + 'static {
    type Resource: Send + Sync + 'static;

    /// Kind reported in pool stats and registry bookkeeping
    fn kind(&self) -> ResourceKind;

    /// Create a fresh resource
    async fn create(&self) -> anyhow::Result<Self::Resource>;

    /// Connectivity check run on acquire of a pooled instance and on release
    async fn validate(&self, resource: &Self::Resource) -> bool;

    /// Dispose of a resource that leaves the pool
    async fn close(&self, resource: Self::Resource) -> anyhow::Result<()>;
}

/// A resource checked out of a pool
///
/// Owned by the caller between `acquire` and `release`; dereferences to the
/// underlying client or connection.
pub struct PooledResource<T> {
    id: Uuid,
    pool_id: Uuid,
    resource: T,
    created_at: DateTime<Utc>,
    last_used: DateTime<Utc>,
    usage_count: u64,
}

impl<T> PooledResource<T> {
    pub(crate) fn new(pool_id: Uuid, resource: T) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pool_id,
            resource,
            created_at: now,
            last_used: now,
            usage_count: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used(&self) -> DateTime<Utc> {
        self.last_used
    }

    /// Number of times this resource has been handed out
    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn get(&self) -> &T {
        &self.resource
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.resource
    }

    pub(crate) fn mark_checked_out(&mut self) {
        self.usage_count += 1;
        self.last_used = Utc::now();
    }

    pub(crate) fn touch(&mut self) {
        self.last_used = Utc::now();
    }

    pub(crate) fn into_inner(self) -> T {
        self.resource
    }
}

impl<T> Deref for PooledResource<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

impl<T> DerefMut for PooledResource<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.resource
    }
}

impl<T> fmt::Debug for PooledResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("id", &self.id)
            .field("pool_id", &self.pool_id)
            .field("created_at", &self.created_at)
            .field("last_used", &self.last_used)
            .field("usage_count", &self.usage_count)
            .finish_non_exhaustive()
    }
}
