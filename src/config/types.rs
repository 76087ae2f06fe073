//! Configuration type definitions.

use serde::Deserialize;

use crate::common::types::{RoomMapping, UserMapping};

/// Default relay queue capacity per target platform.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default recent-hash set capacity for deduplication.
pub const DEFAULT_DEDUP_CAPACITY: usize = 8192;

/// Default per-attempt connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default grace period for draining in-flight messages on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Default age in days after which relay history is cleaned up.
pub const DEFAULT_CLEANUP_AFTER_DAYS: i64 = 30;

/// Default maintenance tick interval in seconds.
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 300;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub matrix: MatrixConfig,
    pub delta: DeltaConfig,
    pub storage: Option<StorageConfig>,
    pub relay: Option<RelayConfig>,
    pub rooms: Option<Vec<RoomSeed>>,
    pub users: Option<Vec<UserSeed>>,
}

impl Config {
    pub fn queue_capacity(&self) -> usize {
        self.relay
            .as_ref()
            .and_then(|r| r.queue_capacity)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn dedup_capacity(&self) -> usize {
        self.relay
            .as_ref()
            .and_then(|r| r.dedup_capacity)
            .unwrap_or(DEFAULT_DEDUP_CAPACITY)
    }

    pub fn connect_timeout_secs(&self) -> u64 {
        self.relay
            .as_ref()
            .and_then(|r| r.connect_timeout_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    pub fn shutdown_grace_secs(&self) -> u64 {
        self.relay
            .as_ref()
            .and_then(|r| r.shutdown_grace_secs)
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS)
    }

    pub fn cleanup_after_days(&self) -> i64 {
        self.relay
            .as_ref()
            .and_then(|r| r.cleanup_after_days)
            .unwrap_or(DEFAULT_CLEANUP_AFTER_DAYS)
    }

    pub fn maintenance_interval_secs(&self) -> u64 {
        self.relay
            .as_ref()
            .and_then(|r| r.maintenance_interval_secs)
            .unwrap_or(DEFAULT_MAINTENANCE_INTERVAL_SECS)
    }

    /// Seed room mappings to upsert into the repository at boot.
    pub fn room_mappings(&self) -> Vec<RoomMapping> {
        self.rooms
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(RoomSeed::to_mapping)
            .collect()
    }

    /// Seed user mappings to upsert into the repository at boot.
    pub fn user_mappings(&self) -> Vec<UserMapping> {
        self.users
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(UserSeed::to_mapping)
            .collect()
    }
}

/// Matrix homeserver session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixConfig {
    /// Homeserver base URL, e.g. "https://matrix.example.org".
    pub homeserver: String,
    /// Fully qualified user id the bridge signs in as, e.g. "@bridge:example.org".
    pub user_id: String,
    pub access_token: String,
}

/// Delta Chat account configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeltaConfig {
    /// Email address the bridge account uses.
    pub addr: String,
    pub password: String,
    /// IMAP host override; derived from the address domain when unset.
    pub imap_host: Option<String>,
    /// SMTP host override; derived from the address domain when unset.
    pub smtp_host: Option<String>,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Unset means an in-memory repository.
    pub path: Option<String>,
}

/// Relay tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub queue_capacity: Option<usize>,
    pub dedup_capacity: Option<usize>,
    pub connect_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
    pub cleanup_after_days: Option<i64>,
    pub maintenance_interval_secs: Option<u64>,
}

/// A room pairing seed from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSeed {
    /// Matrix room id, e.g. "!abc:example.org".
    pub matrix_room: String,
    pub matrix_name: Option<String>,
    /// Delta Chat group id.
    pub delta_group: String,
    pub delta_name: Option<String>,
    /// Defaults to true.
    pub bidirectional: Option<bool>,
}

impl RoomSeed {
    pub fn to_mapping(&self) -> RoomMapping {
        RoomMapping {
            matrix_room_id: self.matrix_room.clone(),
            matrix_room_name: self
                .matrix_name
                .clone()
                .unwrap_or_else(|| self.matrix_room.clone()),
            delta_group_id: self.delta_group.clone(),
            delta_group_name: self
                .delta_name
                .clone()
                .unwrap_or_else(|| self.delta_group.clone()),
            bidirectional: self.bidirectional.unwrap_or(true),
        }
    }
}

/// A user pairing seed from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    /// Matrix user id, e.g. "@alice:example.org".
    pub matrix_user: String,
    pub matrix_name: Option<String>,
    /// Delta Chat address for the same person.
    pub delta_addr: String,
}

impl UserSeed {
    pub fn to_mapping(&self) -> UserMapping {
        UserMapping::new(
            self.matrix_user.clone(),
            self.matrix_name
                .clone()
                .unwrap_or_else(|| self.matrix_user.clone()),
            self.delta_addr.clone(),
        )
    }
}
