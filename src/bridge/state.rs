//! Bridge state management.
//!
//! Live connectivity snapshot for both platforms. Adapters mutate it on
//! every state transition; health checks and the maintenance task read
//! it. Distinct from the persisted `bridge_state` rows, which are
//! written from these snapshots on the maintenance tick.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::common::types::{BridgeStateRecord, Platform};

/// Shared connectivity and error-counter state.
pub struct BridgeHealth {
    inner: Mutex<HashMap<Platform, BridgeStateRecord>>,
}

impl BridgeHealth {
    /// Both platforms start disconnected.
    pub fn new() -> Self {
        let mut inner = HashMap::new();
        for platform in [Platform::Matrix, Platform::Delta] {
            inner.insert(platform, BridgeStateRecord::disconnected(platform));
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Record a connect/disconnect transition.
    pub fn set_connected(&self, platform: Platform, connected: bool) {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .entry(platform)
            .or_insert_with(|| BridgeStateRecord::disconnected(platform));
        record.connected = connected;
        if connected {
            record.last_heartbeat = Some(Utc::now());
        }
    }

    /// Refresh the liveness timestamp for a connected platform.
    pub fn heartbeat(&self, platform: Platform) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.get_mut(&platform) {
            record.last_heartbeat = Some(Utc::now());
        }
    }

    /// Bump the error counter for a platform.
    pub fn record_error(&self, platform: Platform) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.get_mut(&platform) {
            record.error_count += 1;
        }
    }

    pub fn is_connected(&self, platform: Platform) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.get(&platform).map(|r| r.connected).unwrap_or(false)
    }

    /// Snapshot for persistence or inspection.
    pub fn snapshot(&self, platform: Platform) -> BridgeStateRecord {
        let inner = self.inner.lock().unwrap();
        inner
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| BridgeStateRecord::disconnected(platform))
    }
}

impl Default for BridgeHealth {
    fn default() -> Self {
        Self::new()
    }
}
