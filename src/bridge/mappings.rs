//! Cross-platform identity and room resolution.
//!
//! In-memory caches in front of the persistence repository. A
//! resolution miss is not an error: it means "no relay target" and the
//! caller marks the message failed; remapping requires an explicit
//! upsert, never an automatic retry.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::common::error::StoreResult;
use crate::common::types::{Platform, RoomMapping, UserMapping};
use crate::store::SharedRepository;

/// Mapping store with repository-backed caches.
///
/// Each cache is guarded by its own mutex; locks are never held across
/// an await. Misses are not cached, so a mapping added out-of-band
/// becomes visible on the next lookup rather than the next refresh.
pub struct MappingStore {
    repo: SharedRepository,
    rooms: Mutex<HashMap<(Platform, String), RoomMapping>>,
    users: Mutex<HashMap<(Platform, String), UserMapping>>,
}

impl MappingStore {
    pub fn new(repo: SharedRepository) -> Self {
        Self {
            repo,
            rooms: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the room mapping that has `room_id` on `platform`.
    pub async fn resolve_room(
        &self,
        platform: Platform,
        room_id: &str,
    ) -> StoreResult<Option<RoomMapping>> {
        if let Some(cached) = self
            .rooms
            .lock()
            .unwrap()
            .get(&(platform, room_id.to_string()))
        {
            return Ok(Some(cached.clone()));
        }

        let mapping = self.repo.room_mapping_for(platform, room_id).await?;
        if let Some(ref mapping) = mapping {
            debug!(platform = %platform, room_id, "room mapping cache fill");
            self.cache_room(mapping);
        }
        Ok(mapping)
    }

    /// Resolve the active user mapping that has `user_id` on `platform`.
    pub async fn resolve_user(
        &self,
        platform: Platform,
        user_id: &str,
    ) -> StoreResult<Option<UserMapping>> {
        if let Some(cached) = self
            .users
            .lock()
            .unwrap()
            .get(&(platform, user_id.to_string()))
        {
            return Ok(Some(cached.clone()));
        }

        let mapping = self.repo.user_mapping_for(platform, user_id).await?;
        if let Some(ref mapping) = mapping {
            debug!(platform = %platform, user_id, "user mapping cache fill");
            self.cache_user(mapping);
        }
        Ok(mapping)
    }

    /// Write a room pairing to the repository, then refresh the cache.
    pub async fn upsert_room_mapping(&self, mapping: &RoomMapping) -> StoreResult<()> {
        self.repo.upsert_room_mapping(mapping).await?;
        self.cache_room(mapping);
        Ok(())
    }

    /// Write a user pairing to the repository, then refresh the cache.
    ///
    /// The cache is cleared rather than patched: the superseded row's
    /// old delta address key cannot be identified from here.
    pub async fn upsert_user_mapping(&self, mapping: &UserMapping) -> StoreResult<()> {
        self.repo.upsert_user_mapping(mapping).await?;
        self.users.lock().unwrap().clear();
        self.cache_user(mapping);
        Ok(())
    }

    /// Reload both caches from the repository.
    ///
    /// Run from the periodic maintenance tick so out-of-band remappings
    /// replace stale entries.
    pub async fn refresh(&self) -> StoreResult<()> {
        let rooms = self.repo.all_room_mappings().await?;
        let users = self.repo.all_user_mappings().await?;

        {
            let mut cache = self.rooms.lock().unwrap();
            cache.clear();
            for mapping in &rooms {
                cache.insert(
                    (Platform::Matrix, mapping.matrix_room_id.clone()),
                    mapping.clone(),
                );
                cache.insert(
                    (Platform::Delta, mapping.delta_group_id.clone()),
                    mapping.clone(),
                );
            }
        }
        {
            let mut cache = self.users.lock().unwrap();
            cache.clear();
            for mapping in &users {
                cache.insert(
                    (Platform::Matrix, mapping.matrix_user_id.clone()),
                    mapping.clone(),
                );
                cache.insert(
                    (Platform::Delta, mapping.delta_addr.clone()),
                    mapping.clone(),
                );
            }
        }
        debug!(
            rooms = rooms.len(),
            users = users.len(),
            "mapping caches refreshed"
        );
        Ok(())
    }

    /// (active user mappings, room mappings), from the repository.
    pub async fn counts(&self) -> StoreResult<(u64, u64)> {
        self.repo.mapping_counts().await
    }

    fn cache_room(&self, mapping: &RoomMapping) {
        let mut cache = self.rooms.lock().unwrap();
        cache.insert(
            (Platform::Matrix, mapping.matrix_room_id.clone()),
            mapping.clone(),
        );
        cache.insert(
            (Platform::Delta, mapping.delta_group_id.clone()),
            mapping.clone(),
        );
    }

    fn cache_user(&self, mapping: &UserMapping) {
        let mut cache = self.users.lock().unwrap();
        cache.insert(
            (Platform::Matrix, mapping.matrix_user_id.clone()),
            mapping.clone(),
        );
        cache.insert(
            (Platform::Delta, mapping.delta_addr.clone()),
            mapping.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRepository, Repository};
    use std::sync::Arc;

    fn room(matrix: &str, delta: &str, bidirectional: bool) -> RoomMapping {
        RoomMapping {
            matrix_room_id: matrix.to_string(),
            matrix_room_name: matrix.to_string(),
            delta_group_id: delta.to_string(),
            delta_group_name: delta.to_string(),
            bidirectional,
        }
    }

    #[tokio::test]
    async fn test_resolve_room_from_both_sides() {
        let repo = Arc::new(MemoryRepository::new());
        let store = MappingStore::new(repo);
        store
            .upsert_room_mapping(&room("!a:x", "grp-a", true))
            .await
            .unwrap();

        let by_matrix = store
            .resolve_room(Platform::Matrix, "!a:x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_matrix.delta_group_id, "grp-a");

        let by_delta = store
            .resolve_room(Platform::Delta, "grp-a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_delta.matrix_room_id, "!a:x");
    }

    #[tokio::test]
    async fn test_miss_is_not_an_error() {
        let repo = Arc::new(MemoryRepository::new());
        let store = MappingStore::new(repo);
        assert!(store
            .resolve_room(Platform::Matrix, "!nowhere:x")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .resolve_user(Platform::Delta, "ghost@x")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cache_serves_after_fill() {
        let repo = Arc::new(MemoryRepository::new());
        repo.upsert_room_mapping(&room("!a:x", "grp-a", true))
            .await
            .unwrap();

        let store = MappingStore::new(repo.clone());
        // Fill the cache.
        assert!(store
            .resolve_room(Platform::Matrix, "!a:x")
            .await
            .unwrap()
            .is_some());

        // A repository change invisible to the store is still served
        // from cache...
        repo.upsert_room_mapping(&room("!a:x", "grp-b", true))
            .await
            .unwrap();
        let cached = store
            .resolve_room(Platform::Matrix, "!a:x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.delta_group_id, "grp-a");

        // ...until refresh reloads from the repository.
        store.refresh().await.unwrap();
        let refreshed = store
            .resolve_room(Platform::Matrix, "!a:x")
            .await
            .unwrap()
            .unwrap();
        // Both pairings now exist; the one the repository returns wins.
        assert_eq!(refreshed.matrix_room_id, "!a:x");
    }

    #[tokio::test]
    async fn test_user_upsert_invalidates_old_address() {
        let repo = Arc::new(MemoryRepository::new());
        let store = MappingStore::new(repo);

        store
            .upsert_user_mapping(&UserMapping::new("@a:x", "a", "a@old.org"))
            .await
            .unwrap();
        assert!(store
            .resolve_user(Platform::Delta, "a@old.org")
            .await
            .unwrap()
            .is_some());

        store
            .upsert_user_mapping(&UserMapping::new("@a:x", "a", "a@new.org"))
            .await
            .unwrap();

        // The stale delta-side cache entry is gone with the clear.
        assert!(store
            .resolve_user(Platform::Delta, "a@old.org")
            .await
            .unwrap()
            .is_none());
        let active = store
            .resolve_user(Platform::Matrix, "@a:x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.delta_addr, "a@new.org");
    }
}
