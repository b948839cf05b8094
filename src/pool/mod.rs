//! # Typed Resource Pools
//!
//! Bounded, health-checked pools for expensive resources such as browser
//! sessions, database connections and HTTP clients.
//!
//! ## Overview
//!
//! A single generic [`ResourcePool`] handles every kind; what differs per
//! backend is captured by a [`ResourceFactory`] (create, validate, close).
//! Checked-out resources are wrapped in a [`PooledResource`] carrying
//! bookkeeping metadata, and must be handed back with
//! [`ResourcePool::release`].
//!
//! ## Guarantees
//!
//! - Never more than `max_size` resources exist at once, across idle,
//!   checked out and in-flight creations
//! - Waiting acquirers are bounded by a timeout and can be cancelled;
//!   the two failures are distinguishable via [`PoolError::is_timeout`]
//!   and [`PoolError::is_cancelled`]
//! - A failed creation never leaks a capacity slot
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pool = ResourcePool::new("browsers", BrowserFactory::new(), PoolConfig::default())?;
//! pool.initialize().await?;
//!
//! let session = pool.acquire().await?;
//! session.navigate("https://example.test").await?;
//! pool.release(session).await?;
//! ```

pub mod error;
pub mod managed;
pub mod resource;
pub mod resource_pool;
pub mod stats;

pub use error::PoolError;
pub use managed::ManagedPool;
pub use resource::{PooledResource, ResourceFactory};
pub use resource_pool::ResourcePool;
pub use stats::PoolStats;
