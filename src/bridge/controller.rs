//! Bridge controller: the relay state machine.
//!
//! Every normalized message passes through here exactly once and ends
//! in a terminal status: `Sent`, `Failed`, or `Deduped`. The controller
//! owns the dedup guard and the mapping caches; the repository stays
//! the durable source of truth.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bridge::dedup::DedupGuard;
use crate::bridge::mappings::MappingStore;
use crate::bridge::relay::{DeliveryOutcome, QueueFull, RelayCoordinator};
use crate::bridge::state::BridgeHealth;
use crate::common::error::RelayError;
use crate::common::types::{BridgeStats, RelayStatus, RoomMapping, UserMapping};
use crate::common::{content_hash, BridgeMessage};
use crate::store::SharedRepository;

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    relayed: AtomicU64,
    failed: AtomicU64,
    deduped: AtomicU64,
}

/// Orchestrates relay for both directions.
pub struct BridgeController {
    dedup: DedupGuard,
    mappings: MappingStore,
    relay: RelayCoordinator,
    repo: SharedRepository,
    health: Arc<BridgeHealth>,
    counters: Counters,
}

impl BridgeController {
    pub fn new(
        repo: SharedRepository,
        health: Arc<BridgeHealth>,
        relay: RelayCoordinator,
        dedup_capacity: usize,
    ) -> Self {
        Self {
            dedup: DedupGuard::new(dedup_capacity),
            mappings: MappingStore::new(Arc::clone(&repo)),
            relay,
            repo,
            health,
            counters: Counters::default(),
        }
    }

    /// Process one normalized message from an adapter.
    ///
    /// Dedup check, room resolution, display-identity resolution, then
    /// hand-off to the relay coordinator. Terminal failures are decided
    /// here; `Sent` is decided in `record_outcome` once the worker
    /// reports back.
    pub async fn handle_incoming(&self, mut message: BridgeMessage) {
        self.counters.total.fetch_add(1, Ordering::Relaxed);

        if self.dedup.is_duplicate(&message.content_hash) {
            debug!(
                message_id = %message.message_id,
                source = %message.source_platform,
                "duplicate suppressed"
            );
            self.counters.deduped.fetch_add(1, Ordering::Relaxed);
            message.relay_status = RelayStatus::Deduped;
            self.persist_message(&message).await;
            return;
        }

        let mapping = match self
            .mappings
            .resolve_room(message.source_platform, &message.source_room_id)
            .await
        {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "room resolution failed, treating as unmapped"
                );
                None
            }
        };

        let mapping = match mapping {
            Some(mapping) if mapping.allows_from(message.source_platform) => mapping,
            Some(_) => {
                debug!(
                    message_id = %message.message_id,
                    source_room = %message.source_room_id,
                    "mapping is one-way, message not relayed"
                );
                self.fail_message(message, RelayError::NoMapping).await;
                return;
            }
            None => {
                info!(
                    source = %message.source_platform,
                    source_room = %message.source_room_id,
                    sender = %message.sender_id,
                    "no room mapping, message not relayed"
                );
                self.fail_message(message, RelayError::NoMapping).await;
                return;
            }
        };

        message.target_room_id = Some(mapping.room_on(message.target_platform).to_string());

        // Cross-platform display identity; raw sender name stands when
        // unmapped or the lookup fails.
        match self
            .mappings
            .resolve_user(message.source_platform, &message.sender_id)
            .await
        {
            Ok(Some(user)) => {
                message.sender_display_name = user.matrix_display_name.clone();
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "sender resolution failed, using raw display name"
                );
            }
        }

        self.persist_message(&message).await;

        let message_id = message.message_id.clone();
        if let Err(QueueFull(rejected)) = self.relay.enqueue(message) {
            warn!(
                message_id = %message_id,
                target = %rejected.target_platform,
                "relay queue full, dropping message"
            );
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            self.persist_status(&message_id, RelayStatus::Failed, Some(RelayError::QueueFull))
                .await;
        }
    }

    /// Record a delivery outcome reported by a relay worker.
    pub async fn record_outcome(&self, outcome: DeliveryOutcome) {
        let message = outcome.message;
        match outcome.result {
            Ok(()) => {
                debug!(
                    message_id = %message.message_id,
                    target = %message.target_platform,
                    "message relayed"
                );
                self.counters.relayed.fetch_add(1, Ordering::Relaxed);
                self.health.heartbeat(message.target_platform);

                // Remember the message itself and the shape its echo
                // will have when the target platform plays it back as a
                // native event.
                self.dedup.record(message.content_hash.clone());
                if let Some(ref target_room) = message.target_room_id {
                    self.dedup.record(content_hash(
                        message.target_platform,
                        &message.sender_id,
                        target_room,
                        &message.text,
                        outcome.completed_at,
                    ));
                }

                if let Err(e) = self
                    .repo
                    .update_message_status(
                        &message.message_id,
                        RelayStatus::Sent,
                        None,
                        Some(outcome.completed_at),
                    )
                    .await
                {
                    warn!(
                        message_id = %message.message_id,
                        error = %e,
                        "failed to persist sent status"
                    );
                }
            }
            Err(reason) => {
                warn!(
                    message_id = %message.message_id,
                    target = %message.target_platform,
                    reason = %reason,
                    "delivery failed"
                );
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.health.record_error(message.target_platform);
                self.persist_status(&message.message_id, RelayStatus::Failed, Some(reason))
                    .await;
            }
        }
    }

    /// Insert or update a room pairing (operator remediation path).
    pub async fn upsert_room_mapping(
        &self,
        mapping: &RoomMapping,
    ) -> crate::common::error::StoreResult<()> {
        self.mappings.upsert_room_mapping(mapping).await
    }

    /// Append a user pairing, superseding the previous one.
    pub async fn upsert_user_mapping(
        &self,
        mapping: &UserMapping,
    ) -> crate::common::error::StoreResult<()> {
        self.mappings.upsert_user_mapping(mapping).await
    }

    /// Reload mapping caches from the repository.
    pub async fn refresh_mappings(&self) -> crate::common::error::StoreResult<()> {
        self.mappings.refresh().await
    }

    /// Read-only aggregate for health and monitoring.
    ///
    /// Message counters are the in-memory truth (they survive
    /// persistence failures); mapping counts come from the repository.
    pub async fn stats(&self) -> BridgeStats {
        let (user_mapping_count, room_mapping_count) = match self.mappings.counts().await {
            Ok(counts) => counts,
            Err(e) => {
                warn!(error = %e, "mapping counts unavailable");
                (0, 0)
            }
        };

        BridgeStats {
            total_messages: self.counters.total.load(Ordering::Relaxed),
            relayed_messages: self.counters.relayed.load(Ordering::Relaxed),
            failed_messages: self.counters.failed.load(Ordering::Relaxed),
            deduped_messages: self.counters.deduped.load(Ordering::Relaxed),
            user_mapping_count,
            room_mapping_count,
            matrix_connected: self.health.is_connected(crate::common::types::Platform::Matrix),
            delta_connected: self.health.is_connected(crate::common::types::Platform::Delta),
        }
    }

    async fn fail_message(&self, mut message: BridgeMessage, reason: RelayError) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        message.relay_status = RelayStatus::Failed;
        message.relay_error = Some(reason.to_string());
        self.persist_message(&message).await;
    }

    async fn persist_message(&self, message: &BridgeMessage) {
        if let Err(e) = self.repo.save_message(message).await {
            warn!(
                message_id = %message.message_id,
                error = %e,
                "failed to persist message, relay outcome kept in memory"
            );
        }
    }

    async fn persist_status(
        &self,
        message_id: &str,
        status: RelayStatus,
        reason: Option<RelayError>,
    ) {
        let reason = reason.map(|r| r.to_string());
        if let Err(e) = self
            .repo
            .update_message_status(message_id, status, reason.as_deref(), None)
            .await
        {
            warn!(
                message_id = %message_id,
                error = %e,
                "failed to persist status update"
            );
        }
    }
}
