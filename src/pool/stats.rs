//! Pool statistics snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::ResourceKind;

/// Cumulative counters kept under the pool lock
#[derive(Debug, Clone, Default)]
pub(crate) struct PoolCounters {
    pub acquired: u64,
    pub released: u64,
    pub created: u64,
    pub closed: u64,
    pub health_check_failures: u64,
    pub acquire_timeouts: u64,
    pub acquire_cancellations: u64,
}

/// Point-in-time copy of a pool's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub pool: String,
    pub kind: ResourceKind,
    pub max_size: usize,
    /// Resources that currently exist: available + in use
    pub outstanding: usize,
    pub available: usize,
    pub in_use: usize,
    pub total_acquired: u64,
    pub total_released: u64,
    pub total_created: u64,
    pub total_closed: u64,
    /// Stale resources found on acquire or release
    pub health_check_failures: u64,
    pub acquire_timeouts: u64,
    pub acquire_cancellations: u64,
    pub last_activity: DateTime<Utc>,
}

impl PoolStats {
    /// Fraction of capacity currently checked out
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }
        self.in_use as f64 / self.max_size as f64
    }
}
