//! Persistence repository.
//!
//! The durable source of truth for mappings, relay history, and bridge
//! state. The bridge treats the store as eventually-consistent but
//! durable: last write wins per record, and no transactional guarantees
//! beyond that are assumed. Write failures are surfaced as
//! `PersistenceError` and logged by callers; they never roll back an
//! in-memory relay outcome.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::common::error::StoreResult;
use crate::common::types::{
    BridgeConfigRecord, BridgeStateRecord, Platform, RelayStatus, RoomMapping, UserMapping,
};
use crate::common::BridgeMessage;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

/// Relay-history counters aggregated by terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub deduped: u64,
}

/// Durable record of configuration, mappings, and relay history.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist a newly ingested message (normally still `Pending`).
    async fn save_message(&self, message: &BridgeMessage) -> StoreResult<()>;

    /// Record a message's terminal status, failure reason, and relay time.
    async fn update_message_status(
        &self,
        message_id: &str,
        status: RelayStatus,
        error: Option<&str>,
        relayed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<BridgeMessage>>;

    /// Resolve the room mapping that has `room_id` on `platform`.
    async fn room_mapping_for(
        &self,
        platform: Platform,
        room_id: &str,
    ) -> StoreResult<Option<RoomMapping>>;

    /// Resolve the active user mapping that has `user_id` on `platform`.
    async fn user_mapping_for(
        &self,
        platform: Platform,
        user_id: &str,
    ) -> StoreResult<Option<UserMapping>>;

    async fn all_room_mappings(&self) -> StoreResult<Vec<RoomMapping>>;

    /// Active (non-superseded) user mappings.
    async fn all_user_mappings(&self) -> StoreResult<Vec<UserMapping>>;

    /// Insert or update a room pairing, keyed on
    /// (matrix_room_id, delta_group_id).
    async fn upsert_room_mapping(&self, mapping: &RoomMapping) -> StoreResult<()>;

    /// Append a user mapping, soft-superseding any active row for the
    /// same Matrix user. Prior rows are retained.
    async fn upsert_user_mapping(&self, mapping: &UserMapping) -> StoreResult<()>;

    async fn get_bridge_config(&self) -> StoreResult<Option<BridgeConfigRecord>>;

    async fn save_bridge_config(&self, record: &BridgeConfigRecord) -> StoreResult<()>;

    async fn get_bridge_state(&self, platform: Platform)
        -> StoreResult<Option<BridgeStateRecord>>;

    async fn update_bridge_state(&self, record: &BridgeStateRecord) -> StoreResult<()>;

    async fn message_status_counts(&self) -> StoreResult<StatusCounts>;

    /// (active user mappings, room mappings).
    async fn mapping_counts(&self) -> StoreResult<(u64, u64)>;

    /// Delete relay history older than `age`. Returns rows removed.
    async fn cleanup_older_than(&self, age: Duration) -> StoreResult<u64>;
}

/// Shared repository handle for use across async tasks.
pub type SharedRepository = Arc<dyn Repository>;
