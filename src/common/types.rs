//! Shared types used across the application.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The two chat networks the bridge spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// The federated real-time network (rooms on a homeserver).
    Matrix,
    /// The email-based network (chat-over-email groups).
    Delta,
}

impl Platform {
    /// The platform on the other side of the bridge.
    pub fn opposite(&self) -> Self {
        match self {
            Platform::Matrix => Platform::Delta,
            Platform::Delta => Platform::Matrix,
        }
    }

    /// Stable identifier used in persisted rows and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Matrix => "matrix",
            Platform::Delta => "delta",
        }
    }

    /// Parse from a persisted/config identifier.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "matrix" => Some(Platform::Matrix),
            "delta" | "email" => Some(Platform::Delta),
            _ => None,
        }
    }

    /// Label shown in relayed messages, e.g. `[MATRIX]`.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Matrix => "MATRIX",
            Platform::Delta => "EMAIL",
        }
    }

    /// Badge glyph prefixed to relayed messages.
    pub fn badge(&self) -> &'static str {
        match self {
            Platform::Matrix => "🖥️",
            Platform::Delta => "📱",
        }
    }

    /// Reply instruction appended to messages relayed *from* this platform.
    pub fn reply_instruction(&self) -> &'static str {
        match self {
            Platform::Matrix => "Reply in this room to answer",
            Platform::Delta => "Reply via email to answer",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relay outcome of a bridge message.
///
/// `Pending` is the only non-terminal state; a message leaves it exactly
/// once and never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    Pending,
    Sent,
    Failed,
    Deduped,
}

impl RelayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStatus::Pending => "pending",
            RelayStatus::Sent => "sent",
            RelayStatus::Failed => "failed",
            RelayStatus::Deduped => "deduped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RelayStatus::Pending),
            "sent" => Some(RelayStatus::Sent),
            "failed" => Some(RelayStatus::Failed),
            "deduped" => Some(RelayStatus::Deduped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayStatus::Pending)
    }
}

/// Associates a Matrix identity with a Delta Chat address.
///
/// Upserts soft-supersede older rows for the same Matrix user instead of
/// overwriting them, so old relay history stays interpretable.
#[derive(Debug, Clone)]
pub struct UserMapping {
    pub matrix_user_id: String,
    pub matrix_display_name: String,
    pub delta_addr: String,
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
}

impl UserMapping {
    pub fn new(
        matrix_user_id: impl Into<String>,
        matrix_display_name: impl Into<String>,
        delta_addr: impl Into<String>,
    ) -> Self {
        Self {
            matrix_user_id: matrix_user_id.into(),
            matrix_display_name: matrix_display_name.into(),
            delta_addr: delta_addr.into(),
            superseded: false,
            created_at: Utc::now(),
        }
    }

}

/// Associates a Matrix room with a Delta Chat group.
///
/// Unique per (matrix_room_id, delta_group_id). When `bidirectional` is
/// false, relay only flows Matrix -> Delta.
#[derive(Debug, Clone)]
pub struct RoomMapping {
    pub matrix_room_id: String,
    pub matrix_room_name: String,
    pub delta_group_id: String,
    pub delta_group_name: String,
    pub bidirectional: bool,
}

impl RoomMapping {
    /// The room identifier this mapping has on the given platform.
    pub fn room_on(&self, platform: Platform) -> &str {
        match platform {
            Platform::Matrix => &self.matrix_room_id,
            Platform::Delta => &self.delta_group_id,
        }
    }

    /// Whether messages originating on `source` may be relayed.
    pub fn allows_from(&self, source: Platform) -> bool {
        self.bidirectional || source == Platform::Matrix
    }
}

/// One record per deployed bridge instance.
///
/// Created once at setup, updated rarely, read (cached) on every
/// controller operation.
#[derive(Debug, Clone)]
pub struct BridgeConfigRecord {
    pub id: String,
    pub matrix_account: String,
    pub delta_addr: String,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Persisted connectivity snapshot for one platform.
#[derive(Debug, Clone)]
pub struct BridgeStateRecord {
    pub platform: Platform,
    pub connected: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub error_count: u64,
}

impl BridgeStateRecord {
    pub fn disconnected(platform: Platform) -> Self {
        Self {
            platform,
            connected: false,
            last_heartbeat: None,
            error_count: 0,
        }
    }
}

/// Read-only aggregate for health and monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BridgeStats {
    pub total_messages: u64,
    pub relayed_messages: u64,
    pub failed_messages: u64,
    pub deduped_messages: u64,
    pub user_mapping_count: u64,
    pub room_mapping_count: u64,
    pub matrix_connected: bool,
    pub delta_connected: bool,
}
