//! In-memory repository.
//!
//! Backs ephemeral runs (no `storage.path` configured) and tests. It
//! mirrors the SQLite implementation's contract exactly so nothing in
//! the bridge can come to depend on SQLite behavior.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::common::error::StoreResult;
use crate::common::types::{
    BridgeConfigRecord, BridgeStateRecord, Platform, RelayStatus, RoomMapping, UserMapping,
};
use crate::common::BridgeMessage;
use crate::store::{Repository, StatusCounts};

#[derive(Default)]
struct Inner {
    messages: HashMap<String, BridgeMessage>,
    /// Append-only; superseded rows are flagged, never removed.
    user_mappings: Vec<UserMapping>,
    room_mappings: Vec<RoomMapping>,
    config: Option<BridgeConfigRecord>,
    state: HashMap<Platform, BridgeStateRecord>,
}

/// Repository that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_message(&self, message: &BridgeMessage) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .messages
            .insert(message.message_id.clone(), message.clone());
        Ok(())
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        status: RelayStatus,
        error: Option<&str>,
        relayed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.messages.get_mut(message_id) {
            message.relay_status = status;
            message.relay_error = error.map(str::to_string);
            message.relayed_at = relayed_at;
        }
        Ok(())
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<BridgeMessage>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.messages.get(message_id).cloned())
    }

    async fn room_mapping_for(
        &self,
        platform: Platform,
        room_id: &str,
    ) -> StoreResult<Option<RoomMapping>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .room_mappings
            .iter()
            .find(|m| m.room_on(platform) == room_id)
            .cloned())
    }

    async fn user_mapping_for(
        &self,
        platform: Platform,
        user_id: &str,
    ) -> StoreResult<Option<UserMapping>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .user_mappings
            .iter()
            .rev()
            .find(|m| {
                !m.superseded
                    && match platform {
                        Platform::Matrix => m.matrix_user_id == user_id,
                        Platform::Delta => m.delta_addr == user_id,
                    }
            })
            .cloned())
    }

    async fn all_room_mappings(&self) -> StoreResult<Vec<RoomMapping>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.room_mappings.clone())
    }

    async fn all_user_mappings(&self) -> StoreResult<Vec<UserMapping>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .user_mappings
            .iter()
            .filter(|m| !m.superseded)
            .cloned()
            .collect())
    }

    async fn upsert_room_mapping(&self, mapping: &RoomMapping) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.room_mappings.iter_mut().find(|m| {
            m.matrix_room_id == mapping.matrix_room_id
                && m.delta_group_id == mapping.delta_group_id
        }) {
            *existing = mapping.clone();
        } else {
            inner.room_mappings.push(mapping.clone());
        }
        Ok(())
    }

    async fn upsert_user_mapping(&self, mapping: &UserMapping) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        for existing in inner
            .user_mappings
            .iter_mut()
            .filter(|m| m.matrix_user_id == mapping.matrix_user_id)
        {
            existing.superseded = true;
        }
        let mut mapping = mapping.clone();
        mapping.superseded = false;
        inner.user_mappings.push(mapping);
        Ok(())
    }

    async fn get_bridge_config(&self) -> StoreResult<Option<BridgeConfigRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.config.clone())
    }

    async fn save_bridge_config(&self, record: &BridgeConfigRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.config = Some(record.clone());
        Ok(())
    }

    async fn get_bridge_state(
        &self,
        platform: Platform,
    ) -> StoreResult<Option<BridgeStateRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.state.get(&platform).cloned())
    }

    async fn update_bridge_state(&self, record: &BridgeStateRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.state.insert(record.platform, record.clone());
        Ok(())
    }

    async fn message_status_counts(&self) -> StoreResult<StatusCounts> {
        let inner = self.inner.lock().unwrap();
        let mut counts = StatusCounts::default();
        for message in inner.messages.values() {
            counts.total += 1;
            match message.relay_status {
                RelayStatus::Sent => counts.sent += 1,
                RelayStatus::Failed => counts.failed += 1,
                RelayStatus::Deduped => counts.deduped += 1,
                RelayStatus::Pending => {}
            }
        }
        Ok(counts)
    }

    async fn mapping_counts(&self) -> StoreResult<(u64, u64)> {
        let inner = self.inner.lock().unwrap();
        let users = inner.user_mappings.iter().filter(|m| !m.superseded).count() as u64;
        let rooms = inner.room_mappings.len() as u64;
        Ok((users, rooms))
    }

    async fn cleanup_older_than(&self, age: Duration) -> StoreResult<u64> {
        let cutoff = Utc::now() - age;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.messages.len();
        inner.messages.retain(|_, m| m.created_at >= cutoff);
        Ok((before - inner.messages.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NativeEvent;

    fn sample_message() -> BridgeMessage {
        BridgeMessage::from_event(NativeEvent {
            platform: Platform::Delta,
            sender_id: "bob@example.org".to_string(),
            sender_display_name: "bob".to_string(),
            room_id: "grp-1".to_string(),
            text: "hi from email".to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_message_status_update() {
        let repo = MemoryRepository::new();
        let message = sample_message();
        repo.save_message(&message).await.unwrap();

        repo.update_message_status(
            &message.message_id,
            RelayStatus::Failed,
            Some("no room mapping"),
            None,
        )
        .await
        .unwrap();

        let loaded = repo.get_message(&message.message_id).await.unwrap().unwrap();
        assert_eq!(loaded.relay_status, RelayStatus::Failed);
        assert_eq!(loaded.relay_error.as_deref(), Some("no room mapping"));
    }

    #[tokio::test]
    async fn test_user_mapping_soft_supersede() {
        let repo = MemoryRepository::new();
        repo.upsert_user_mapping(&UserMapping::new("@a:x", "a", "a@old.org"))
            .await
            .unwrap();
        repo.upsert_user_mapping(&UserMapping::new("@a:x", "a", "a@new.org"))
            .await
            .unwrap();

        let active = repo
            .user_mapping_for(Platform::Matrix, "@a:x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.delta_addr, "a@new.org");
        assert_eq!(repo.mapping_counts().await.unwrap().0, 1);
    }

    #[tokio::test]
    async fn test_cleanup_older_than() {
        let repo = MemoryRepository::new();
        let mut old = sample_message();
        old.created_at = Utc::now() - Duration::days(45);
        repo.save_message(&old).await.unwrap();
        repo.save_message(&sample_message()).await.unwrap();

        let removed = repo.cleanup_older_than(Duration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.message_status_counts().await.unwrap().total, 1);
    }
}
