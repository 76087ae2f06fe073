//! SQLite-backed repository.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread; do not create additional connections for writes.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use async_trait::async_trait;

use crate::common::error::{PersistenceError, StoreResult};
use crate::common::types::{
    BridgeConfigRecord, BridgeStateRecord, Platform, RelayStatus, RoomMapping, UserMapping,
};
use crate::common::BridgeMessage;
use crate::store::{Repository, StatusCounts};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bridge_messages (
    message_id          TEXT PRIMARY KEY,
    source_platform     TEXT NOT NULL,
    target_platform     TEXT NOT NULL,
    sender_id           TEXT NOT NULL,
    sender_display_name TEXT NOT NULL,
    body                TEXT NOT NULL,
    source_room_id      TEXT NOT NULL,
    target_room_id      TEXT,
    content_hash        TEXT NOT NULL,
    relay_status        TEXT NOT NULL,
    relay_error         TEXT,
    created_at          TEXT NOT NULL,
    relayed_at          TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_created_at
    ON bridge_messages (created_at);

CREATE TABLE IF NOT EXISTS user_mappings (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    matrix_user_id      TEXT NOT NULL,
    matrix_display_name TEXT NOT NULL,
    delta_addr          TEXT NOT NULL,
    superseded          INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_user_mappings_matrix
    ON user_mappings (matrix_user_id, superseded);

CREATE TABLE IF NOT EXISTS room_mappings (
    matrix_room_id   TEXT NOT NULL,
    matrix_room_name TEXT NOT NULL,
    delta_group_id   TEXT NOT NULL,
    delta_group_name TEXT NOT NULL,
    bidirectional    INTEGER NOT NULL,
    PRIMARY KEY (matrix_room_id, delta_group_id)
);

CREATE TABLE IF NOT EXISTS bridge_config (
    id             TEXT PRIMARY KEY,
    matrix_account TEXT NOT NULL,
    delta_addr     TEXT NOT NULL,
    enabled        INTEGER NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bridge_state (
    platform       TEXT PRIMARY KEY,
    connected      INTEGER NOT NULL,
    last_heartbeat TEXT,
    error_count    INTEGER NOT NULL
);
";

/// Repository backed by a SQLite database file.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open (creating if needed) the database at `path` and initialize
    /// the schema.
    pub async fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path.to_owned())
            .await
            .map_err(|e| PersistenceError::Open {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|e: tokio_rusqlite::Error| PersistenceError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self { conn })
    }
}

fn query_err(e: tokio_rusqlite::Error) -> PersistenceError {
    PersistenceError::Query {
        message: e.to_string(),
    }
}

/// Timestamps are stored as UTC RFC 3339 with a trailing `Z`, which
/// keeps lexicographic and chronological order identical.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn bad_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unparseable column value '{}'", value),
        )),
    )
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| bad_column(idx, &s))
}

fn parse_opt_ts(idx: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(idx, s)).transpose()
}

fn parse_platform(idx: usize, s: String) -> rusqlite::Result<Platform> {
    Platform::from_str(&s).ok_or_else(|| bad_column(idx, &s))
}

fn parse_status(idx: usize, s: String) -> rusqlite::Result<RelayStatus> {
    RelayStatus::from_str(&s).ok_or_else(|| bad_column(idx, &s))
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BridgeMessage> {
    Ok(BridgeMessage {
        message_id: row.get(0)?,
        source_platform: parse_platform(1, row.get(1)?)?,
        target_platform: parse_platform(2, row.get(2)?)?,
        sender_id: row.get(3)?,
        sender_display_name: row.get(4)?,
        text: row.get(5)?,
        source_room_id: row.get(6)?,
        target_room_id: row.get(7)?,
        content_hash: row.get(8)?,
        relay_status: parse_status(9, row.get(9)?)?,
        relay_error: row.get(10)?,
        created_at: parse_ts(11, row.get(11)?)?,
        relayed_at: parse_opt_ts(12, row.get(12)?)?,
    })
}

fn room_mapping_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomMapping> {
    Ok(RoomMapping {
        matrix_room_id: row.get(0)?,
        matrix_room_name: row.get(1)?,
        delta_group_id: row.get(2)?,
        delta_group_name: row.get(3)?,
        bidirectional: row.get::<_, i64>(4)? != 0,
    })
}

fn user_mapping_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserMapping> {
    Ok(UserMapping {
        matrix_user_id: row.get(0)?,
        matrix_display_name: row.get(1)?,
        delta_addr: row.get(2)?,
        superseded: row.get::<_, i64>(3)? != 0,
        created_at: parse_ts(4, row.get(4)?)?,
    })
}

const MESSAGE_COLUMNS: &str = "message_id, source_platform, target_platform, sender_id, \
     sender_display_name, body, source_room_id, target_room_id, content_hash, \
     relay_status, relay_error, created_at, relayed_at";

#[async_trait]
impl Repository for SqliteRepository {
    async fn save_message(&self, message: &BridgeMessage) -> StoreResult<()> {
        let m = message.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO bridge_messages (message_id, source_platform, \
                     target_platform, sender_id, sender_display_name, body, source_room_id, \
                     target_room_id, content_hash, relay_status, relay_error, created_at, \
                     relayed_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        m.message_id,
                        m.source_platform.as_str(),
                        m.target_platform.as_str(),
                        m.sender_id,
                        m.sender_display_name,
                        m.text,
                        m.source_room_id,
                        m.target_room_id,
                        m.content_hash,
                        m.relay_status.as_str(),
                        m.relay_error,
                        ts(m.created_at),
                        m.relayed_at.map(ts),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(query_err)
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        status: RelayStatus,
        error: Option<&str>,
        relayed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let message_id = message_id.to_string();
        let error = error.map(str::to_string);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE bridge_messages \
                     SET relay_status = ?2, relay_error = ?3, relayed_at = ?4 \
                     WHERE message_id = ?1",
                    params![message_id, status.as_str(), error, relayed_at.map(ts)],
                )?;
                Ok(())
            })
            .await
            .map_err(query_err)
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<BridgeMessage>> {
        let message_id = message_id.to_string();
        self.conn
            .call(move |conn| {
                let message = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM bridge_messages WHERE message_id = ?1",
                            MESSAGE_COLUMNS
                        ),
                        params![message_id],
                        message_from_row,
                    )
                    .optional()?;
                Ok(message)
            })
            .await
            .map_err(query_err)
    }

    async fn room_mapping_for(
        &self,
        platform: Platform,
        room_id: &str,
    ) -> StoreResult<Option<RoomMapping>> {
        let room_id = room_id.to_string();
        let column = match platform {
            Platform::Matrix => "matrix_room_id",
            Platform::Delta => "delta_group_id",
        };
        self.conn
            .call(move |conn| {
                let mapping = conn
                    .query_row(
                        &format!(
                            "SELECT matrix_room_id, matrix_room_name, delta_group_id, \
                             delta_group_name, bidirectional \
                             FROM room_mappings WHERE {} = ?1",
                            column
                        ),
                        params![room_id],
                        room_mapping_from_row,
                    )
                    .optional()?;
                Ok(mapping)
            })
            .await
            .map_err(query_err)
    }

    async fn user_mapping_for(
        &self,
        platform: Platform,
        user_id: &str,
    ) -> StoreResult<Option<UserMapping>> {
        let user_id = user_id.to_string();
        let column = match platform {
            Platform::Matrix => "matrix_user_id",
            Platform::Delta => "delta_addr",
        };
        self.conn
            .call(move |conn| {
                let mapping = conn
                    .query_row(
                        &format!(
                            "SELECT matrix_user_id, matrix_display_name, delta_addr, \
                             superseded, created_at \
                             FROM user_mappings WHERE {} = ?1 AND superseded = 0 \
                             ORDER BY id DESC LIMIT 1",
                            column
                        ),
                        params![user_id],
                        user_mapping_from_row,
                    )
                    .optional()?;
                Ok(mapping)
            })
            .await
            .map_err(query_err)
    }

    async fn all_room_mappings(&self) -> StoreResult<Vec<RoomMapping>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT matrix_room_id, matrix_room_name, delta_group_id, \
                     delta_group_name, bidirectional FROM room_mappings",
                )?;
                let rows = stmt.query_map([], room_mapping_from_row)?;
                let mut mappings = Vec::new();
                for row in rows {
                    mappings.push(row?);
                }
                Ok(mappings)
            })
            .await
            .map_err(query_err)
    }

    async fn all_user_mappings(&self) -> StoreResult<Vec<UserMapping>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT matrix_user_id, matrix_display_name, delta_addr, superseded, \
                     created_at FROM user_mappings WHERE superseded = 0",
                )?;
                let rows = stmt.query_map([], user_mapping_from_row)?;
                let mut mappings = Vec::new();
                for row in rows {
                    mappings.push(row?);
                }
                Ok(mappings)
            })
            .await
            .map_err(query_err)
    }

    async fn upsert_room_mapping(&self, mapping: &RoomMapping) -> StoreResult<()> {
        let m = mapping.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO room_mappings (matrix_room_id, matrix_room_name, \
                     delta_group_id, delta_group_name, bidirectional) \
                     VALUES (?1, ?2, ?3, ?4, ?5) \
                     ON CONFLICT (matrix_room_id, delta_group_id) DO UPDATE SET \
                     matrix_room_name = ?2, delta_group_name = ?4, bidirectional = ?5",
                    params![
                        m.matrix_room_id,
                        m.matrix_room_name,
                        m.delta_group_id,
                        m.delta_group_name,
                        m.bidirectional as i64,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(query_err)
    }

    async fn upsert_user_mapping(&self, mapping: &UserMapping) -> StoreResult<()> {
        let m = mapping.clone();
        self.conn
            .call(move |conn| {
                // Soft-supersede, never overwrite: prior rows keep relay
                // history interpretable.
                conn.execute(
                    "UPDATE user_mappings SET superseded = 1 \
                     WHERE matrix_user_id = ?1 AND superseded = 0",
                    params![m.matrix_user_id],
                )?;
                conn.execute(
                    "INSERT INTO user_mappings (matrix_user_id, matrix_display_name, \
                     delta_addr, superseded, created_at) \
                     VALUES (?1, ?2, ?3, 0, ?4)",
                    params![
                        m.matrix_user_id,
                        m.matrix_display_name,
                        m.delta_addr,
                        ts(m.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(query_err)
    }

    async fn get_bridge_config(&self) -> StoreResult<Option<BridgeConfigRecord>> {
        self.conn
            .call(|conn| {
                let record = conn
                    .query_row(
                        "SELECT id, matrix_account, delta_addr, enabled, updated_at \
                         FROM bridge_config LIMIT 1",
                        [],
                        |row| {
                            Ok(BridgeConfigRecord {
                                id: row.get(0)?,
                                matrix_account: row.get(1)?,
                                delta_addr: row.get(2)?,
                                enabled: row.get::<_, i64>(3)? != 0,
                                updated_at: parse_ts(4, row.get(4)?)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(query_err)
    }

    async fn save_bridge_config(&self, record: &BridgeConfigRecord) -> StoreResult<()> {
        let r = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO bridge_config \
                     (id, matrix_account, delta_addr, enabled, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        r.id,
                        r.matrix_account,
                        r.delta_addr,
                        r.enabled as i64,
                        ts(r.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(query_err)
    }

    async fn get_bridge_state(
        &self,
        platform: Platform,
    ) -> StoreResult<Option<BridgeStateRecord>> {
        self.conn
            .call(move |conn| {
                let record = conn
                    .query_row(
                        "SELECT platform, connected, last_heartbeat, error_count \
                         FROM bridge_state WHERE platform = ?1",
                        params![platform.as_str()],
                        |row| {
                            Ok(BridgeStateRecord {
                                platform: parse_platform(0, row.get(0)?)?,
                                connected: row.get::<_, i64>(1)? != 0,
                                last_heartbeat: parse_opt_ts(2, row.get(2)?)?,
                                error_count: row.get::<_, i64>(3)? as u64,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(query_err)
    }

    async fn update_bridge_state(&self, record: &BridgeStateRecord) -> StoreResult<()> {
        let r = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO bridge_state \
                     (platform, connected, last_heartbeat, error_count) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        r.platform.as_str(),
                        r.connected as i64,
                        r.last_heartbeat.map(ts),
                        r.error_count as i64,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(query_err)
    }

    async fn message_status_counts(&self) -> StoreResult<StatusCounts> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT relay_status, COUNT(*) FROM bridge_messages GROUP BY relay_status",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?;

                let mut counts = StatusCounts::default();
                for row in rows {
                    let (status, count) = row?;
                    counts.total += count;
                    match RelayStatus::from_str(&status) {
                        Some(RelayStatus::Sent) => counts.sent += count,
                        Some(RelayStatus::Failed) => counts.failed += count,
                        Some(RelayStatus::Deduped) => counts.deduped += count,
                        _ => {}
                    }
                }
                Ok(counts)
            })
            .await
            .map_err(query_err)
    }

    async fn mapping_counts(&self) -> StoreResult<(u64, u64)> {
        self.conn
            .call(|conn| {
                let users: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM user_mappings WHERE superseded = 0",
                    [],
                    |row| row.get(0),
                )?;
                let rooms: i64 =
                    conn.query_row("SELECT COUNT(*) FROM room_mappings", [], |row| row.get(0))?;
                Ok((users as u64, rooms as u64))
            })
            .await
            .map_err(query_err)
    }

    async fn cleanup_older_than(&self, age: Duration) -> StoreResult<u64> {
        let cutoff = ts(Utc::now() - age);
        self.conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM bridge_messages WHERE created_at < ?1",
                    params![cutoff],
                )?;
                Ok(removed as u64)
            })
            .await
            .map_err(query_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Platform;
    use crate::common::NativeEvent;
    use tempfile::tempdir;

    async fn open_test_repo() -> (SqliteRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("courier-test.db");
        let repo = SqliteRepository::open(path.to_str().unwrap()).await.unwrap();
        (repo, dir)
    }

    fn sample_message() -> BridgeMessage {
        BridgeMessage::from_event(NativeEvent {
            platform: Platform::Matrix,
            sender_id: "@alice:example.org".to_string(),
            sender_display_name: "alice".to_string(),
            room_id: "!general:example.org".to_string(),
            text: "hello".to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_message_roundtrip_and_status_update() {
        let (repo, _dir) = open_test_repo().await;

        let message = sample_message();
        repo.save_message(&message).await.unwrap();

        let loaded = repo.get_message(&message.message_id).await.unwrap().unwrap();
        assert_eq!(loaded.relay_status, RelayStatus::Pending);
        assert_eq!(loaded.content_hash, message.content_hash);
        assert_eq!(loaded.text, "hello");

        let relayed_at = Utc::now();
        repo.update_message_status(
            &message.message_id,
            RelayStatus::Sent,
            None,
            Some(relayed_at),
        )
        .await
        .unwrap();

        let loaded = repo.get_message(&message.message_id).await.unwrap().unwrap();
        assert_eq!(loaded.relay_status, RelayStatus::Sent);
        assert!(loaded.relayed_at.is_some());
    }

    #[tokio::test]
    async fn test_room_mapping_resolves_from_both_sides() {
        let (repo, _dir) = open_test_repo().await;

        let mapping = RoomMapping {
            matrix_room_id: "!general:example.org".to_string(),
            matrix_room_name: "General".to_string(),
            delta_group_id: "grp-1".to_string(),
            delta_group_name: "General".to_string(),
            bidirectional: true,
        };
        repo.upsert_room_mapping(&mapping).await.unwrap();

        let by_matrix = repo
            .room_mapping_for(Platform::Matrix, "!general:example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_matrix.delta_group_id, "grp-1");

        let by_delta = repo
            .room_mapping_for(Platform::Delta, "grp-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_delta.matrix_room_id, "!general:example.org");

        assert!(repo
            .room_mapping_for(Platform::Matrix, "!other:example.org")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_room_mapping_upsert_updates_in_place() {
        let (repo, _dir) = open_test_repo().await;

        let mut mapping = RoomMapping {
            matrix_room_id: "!general:example.org".to_string(),
            matrix_room_name: "General".to_string(),
            delta_group_id: "grp-1".to_string(),
            delta_group_name: "General".to_string(),
            bidirectional: true,
        };
        repo.upsert_room_mapping(&mapping).await.unwrap();

        mapping.bidirectional = false;
        mapping.matrix_room_name = "Announcements".to_string();
        repo.upsert_room_mapping(&mapping).await.unwrap();

        let mappings = repo.all_room_mappings().await.unwrap();
        assert_eq!(mappings.len(), 1);
        assert!(!mappings[0].bidirectional);
        assert_eq!(mappings[0].matrix_room_name, "Announcements");
    }

    #[tokio::test]
    async fn test_user_mapping_soft_supersede() {
        let (repo, _dir) = open_test_repo().await;

        let first = UserMapping::new("@alice:example.org", "alice", "alice@old.org");
        repo.upsert_user_mapping(&first).await.unwrap();

        let second = UserMapping::new("@alice:example.org", "alice", "alice@new.org");
        repo.upsert_user_mapping(&second).await.unwrap();

        // Only the newest row is active.
        let active = repo
            .user_mapping_for(Platform::Matrix, "@alice:example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.delta_addr, "alice@new.org");

        let all_active = repo.all_user_mappings().await.unwrap();
        assert_eq!(all_active.len(), 1);

        // The superseded address no longer resolves.
        assert!(repo
            .user_mapping_for(Platform::Delta, "alice@old.org")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_status_counts() {
        let (repo, _dir) = open_test_repo().await;

        let sent = sample_message();
        repo.save_message(&sent).await.unwrap();
        repo.update_message_status(&sent.message_id, RelayStatus::Sent, None, Some(Utc::now()))
            .await
            .unwrap();

        let failed = sample_message();
        repo.save_message(&failed).await.unwrap();
        repo.update_message_status(
            &failed.message_id,
            RelayStatus::Failed,
            Some("no room mapping"),
            None,
        )
        .await
        .unwrap();

        let counts = repo.message_status_counts().await.unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.sent, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.deduped, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_messages() {
        let (repo, _dir) = open_test_repo().await;

        let mut old = sample_message();
        old.created_at = Utc::now() - Duration::days(60);
        repo.save_message(&old).await.unwrap();

        let fresh = sample_message();
        repo.save_message(&fresh).await.unwrap();

        let removed = repo.cleanup_older_than(Duration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_message(&old.message_id).await.unwrap().is_none());
        assert!(repo.get_message(&fresh.message_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bridge_state_roundtrip() {
        let (repo, _dir) = open_test_repo().await;

        assert!(repo
            .get_bridge_state(Platform::Matrix)
            .await
            .unwrap()
            .is_none());

        let record = BridgeStateRecord {
            platform: Platform::Matrix,
            connected: true,
            last_heartbeat: Some(Utc::now()),
            error_count: 3,
        };
        repo.update_bridge_state(&record).await.unwrap();

        let loaded = repo
            .get_bridge_state(Platform::Matrix)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.connected);
        assert_eq!(loaded.error_count, 3);
        assert!(loaded.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn test_bridge_config_roundtrip() {
        let (repo, _dir) = open_test_repo().await;

        let record = BridgeConfigRecord {
            id: "default".to_string(),
            matrix_account: "@bridge:example.org".to_string(),
            delta_addr: "bridge@example.org".to_string(),
            enabled: true,
            updated_at: Utc::now(),
        };
        repo.save_bridge_config(&record).await.unwrap();

        let loaded = repo.get_bridge_config().await.unwrap().unwrap();
        assert_eq!(loaded.id, "default");
        assert!(loaded.enabled);
    }
}
