//! Per-kind lifecycle statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle counters for one [`ResourceKind`](crate::constants::ResourceKind)
///
/// `active` tracks what is registered right now. `total`, `created`,
/// `cleaned` and `leaked` are cumulative for the registry's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeStats {
    pub active: u64,
    pub total: u64,
    pub created: u64,
    /// Resources whose cleanup succeeded
    pub cleaned: u64,
    /// Resources whose cleanup failed or timed out
    pub leaked: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ResourceTypeStats {
    pub(crate) fn record_registered(&mut self) {
        self.active += 1;
        self.total += 1;
        self.created += 1;
        self.last_activity = Some(Utc::now());
    }

    pub(crate) fn record_removed(&mut self) {
        self.active = self.active.saturating_sub(1);
        self.last_activity = Some(Utc::now());
    }

    pub(crate) fn record_cleanup(&mut self, succeeded: bool) {
        if succeeded {
            self.cleaned += 1;
        } else {
            self.leaked += 1;
        }
        self.last_activity = Some(Utc::now());
    }
}
