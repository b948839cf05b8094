//! # Resource Registry
//!
//! Central bookkeeping for every live resource the framework owns, whatever
//! its backend.
//!
//! ## Overview
//!
//! Pools manage homogeneous resources; the registry tracks heterogeneous
//! ones (browser sessions, database wrappers, HTTP clients, whole pools)
//! under a single global capacity and keeps per-kind lifecycle counters.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── ManagedResource       (capability implemented by backends)
//! ├── ResourceRegistry      (ID → resource map, capacity, maintenance ticker)
//! └── ResourceTypeStats     (active / total / created / cleaned / leaked)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gauntlet_core::config::RegistryConfig;
//! use gauntlet_core::registry::ResourceRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ResourceRegistry::new(RegistryConfig::default()));
//! registry.start_maintenance()?;
//!
//! // ... register resources as backends create them ...
//!
//! registry.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod resource;
pub mod resource_registry;
pub mod stats;

pub use error::RegistryError;
pub use resource::ManagedResource;
pub use resource_registry::{MaintenanceReport, ResourceRegistry};
pub use stats::ResourceTypeStats;
