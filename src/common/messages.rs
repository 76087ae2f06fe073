//! Canonical message types for bridge communication.
//!
//! This module defines the normalized envelope that flows between the
//! platform adapters and the bridge controller, and the content hash
//! used for echo suppression.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::common::types::{Platform, RelayStatus};

/// A platform event as the adapter hands it to the bridge.
///
/// Adapters have already dropped events from the bridge's own identity
/// before one of these is produced.
#[derive(Debug, Clone)]
pub struct NativeEvent {
    /// Platform the event originated on.
    pub platform: Platform,
    /// Sender identity in the source platform's identity space.
    pub sender_id: String,
    /// Sender display name as the source platform shows it.
    pub sender_display_name: String,
    /// Native room/group identifier the event occurred in.
    pub room_id: String,
    /// Message body.
    pub text: String,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Normalized, platform-agnostic message envelope.
#[derive(Debug, Clone)]
pub struct BridgeMessage {
    /// Opaque unique identifier, generated at ingestion.
    pub message_id: String,
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub sender_id: String,
    pub sender_display_name: String,
    pub text: String,
    pub source_room_id: String,
    /// Non-empty only once a room mapping has resolved it.
    pub target_room_id: Option<String>,
    /// Deterministic hash used for deduplication.
    pub content_hash: String,
    pub relay_status: RelayStatus,
    pub relay_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub relayed_at: Option<DateTime<Utc>>,
}

impl BridgeMessage {
    /// Normalize a native event into a pending bridge message.
    pub fn from_event(event: NativeEvent) -> Self {
        let content_hash = content_hash(
            event.platform,
            &event.sender_id,
            &event.room_id,
            &event.text,
            event.occurred_at,
        );
        Self {
            message_id: Uuid::new_v4().to_string(),
            source_platform: event.platform,
            target_platform: event.platform.opposite(),
            sender_id: event.sender_id,
            sender_display_name: event.sender_display_name,
            text: event.text,
            source_room_id: event.room_id,
            target_room_id: None,
            content_hash,
            relay_status: RelayStatus::Pending,
            relay_error: None,
            created_at: Utc::now(),
            relayed_at: None,
        }
    }
}

/// Seconds per dedup timestamp bucket.
///
/// A message and its just-delivered echo must hash identically despite
/// small clock skew, so timestamps are coarsened to the minute.
const HASH_BUCKET_SECS: i64 = 60;

/// Deterministic dedup hash over the message identity.
///
/// Covers (source platform, sender, source room, text, minute bucket);
/// the target side is deliberately excluded so an echo delivered on the
/// opposite platform collides with the original.
pub fn content_hash(
    platform: Platform,
    sender_id: &str,
    room_id: &str,
    text: &str,
    at: DateTime<Utc>,
) -> String {
    let bucket = at.timestamp().div_euclid(HASH_BUCKET_SECS);
    let mut hasher = Sha256::new();
    hasher.update(platform.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(sender_id.as_bytes());
    hasher.update([0]);
    hasher.update(room_id.as_bytes());
    hasher.update([0]);
    hasher.update(text.as_bytes());
    hasher.update([0]);
    hasher.update(bucket.to_be_bytes());
    let digest = hasher.finalize();

    use std::fmt::Write;
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
