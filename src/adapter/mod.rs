//! Platform adapters.
//!
//! Each adapter owns a live session to one chat network through the
//! `ChatClient` boundary, normalizes native events into
//! `BridgeMessage`s, and delivers normalized messages natively. The
//! protocol client libraries themselves are external: an adapter is
//! constructed with any `ChatClient` implementation, and a build
//! without one surfaces `UnavailableError` at construction instead of
//! a silently degraded stub.
//!
//! ## Module Structure
//!
//! - `delta`: Delta Chat (email) adapter
//! - `format`: Relayed-message rendering
//! - `matrix`: Matrix adapter

pub mod delta;
pub mod format;
pub mod matrix;

pub use delta::DeltaAdapter;
pub use matrix::MatrixAdapter;

use std::time::Duration;

use async_trait::async_trait;
use backon::BackoffBuilder;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::bridge::state::BridgeHealth;
use crate::common::error::{ConnError, ConnResult, SendResult};
use crate::common::types::Platform;
use crate::common::{BridgeMessage, NativeEvent};

/// Messages starting with this prefix are answered locally by the
/// response generator and never relayed.
pub const RESPONDER_PREFIX: &str = "!ask ";

/// A raw event as the protocol client surfaces it.
#[derive(Debug, Clone)]
pub struct ClientEvent {
    pub sender_id: String,
    pub sender_display_name: String,
    pub room_id: String,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
}

/// Black-box boundary to one protocol client library.
///
/// Implementations handle login, membership, and raw transport; the
/// bridge only consumes this surface. `next_event` is an infinite,
/// non-restartable sequence: `None` means the connection is lost and a
/// fresh `connect` is required.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn connect(&self) -> ConnResult<()>;

    async fn next_event(&self) -> Option<ClientEvent>;

    async fn send_text(&self, room_id: &str, text: &str) -> SendResult<()>;

    /// The bridge's own identity on this platform, used to drop echoes
    /// of its own deliveries.
    fn self_id(&self) -> &str;
}

/// The conversational response generator.
///
/// How replies are produced is not the bridge's concern; adapters only
/// need a capability that may answer a prompt.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, prompt: &str) -> Option<String>;
}

/// Delivery surface the relay workers drive.
#[async_trait]
pub trait Outbound: Send + Sync {
    fn platform(&self) -> Platform;

    /// Render and transmit a normalized message to its target room.
    async fn deliver(&self, message: &BridgeMessage) -> SendResult<()>;
}

/// Outcome of a connect loop.
pub(crate) enum ConnectOutcome {
    Connected,
    ShuttingDown,
}

/// Exponential backoff for reconnection: 1s initial, 60s cap, jittered,
/// unlimited retries.
fn reconnect_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(60))
        .with_jitter()
        .without_max_times()
        .build()
}

/// Connect with per-attempt timeout and exponential backoff.
///
/// Network errors and timeouts are retried; auth errors fail fast and
/// require operator intervention.
pub(crate) async fn connect_with_backoff(
    client: &dyn ChatClient,
    platform: Platform,
    health: &BridgeHealth,
    attempt_timeout: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> ConnResult<ConnectOutcome> {
    let mut backoff = reconnect_backoff();

    loop {
        info!(%platform, "connecting");
        match tokio::time::timeout(attempt_timeout, client.connect()).await {
            Ok(Ok(())) => {
                info!(%platform, "connected");
                health.set_connected(platform, true);
                return Ok(ConnectOutcome::Connected);
            }
            Ok(Err(e)) if !e.is_retryable() => {
                error!(%platform, error = %e, "authentication failed, not retrying");
                health.record_error(platform);
                return Err(e);
            }
            Ok(Err(e)) => {
                warn!(%platform, error = %e, "connection attempt failed");
                health.record_error(platform);
            }
            Err(_) => {
                warn!(%platform, timeout_secs = attempt_timeout.as_secs(), "connection attempt timed out");
                health.record_error(platform);
            }
        }

        let delay = backoff.next().unwrap_or(Duration::from_secs(60));
        info!(%platform, "reconnecting in {:.1} seconds", delay.as_secs_f64());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return Ok(ConnectOutcome::ShuttingDown);
                }
            }
        }
    }
}

/// Shared ingestion loop for both adapters.
///
/// Drains the client's event stream, drops the bridge's own events,
/// answers responder commands locally, and forwards everything else
/// normalized to the controller. Connection loss triggers reconnection
/// with backoff; an auth failure ends the loop.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn ingest_loop<F>(
    client: &dyn ChatClient,
    platform: Platform,
    health: &BridgeHealth,
    responder: Option<&dyn Responder>,
    attempt_timeout: Duration,
    normalize: F,
    ingest_tx: &mpsc::UnboundedSender<BridgeMessage>,
    shutdown_rx: &mut watch::Receiver<bool>,
) where
    F: Fn(ClientEvent) -> Option<NativeEvent>,
{
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!(%platform, "ingestion stopping on shutdown");
                    break;
                }
            }
            maybe = client.next_event() => match maybe {
                Some(event) => {
                    // Feedback-loop filter: never relay our own messages.
                    if event.sender_id == client.self_id() {
                        continue;
                    }

                    if let Some(prompt) = event.text.strip_prefix(RESPONDER_PREFIX) {
                        handle_command(client, platform, responder, &event.room_id, prompt).await;
                        continue;
                    }

                    if let Some(native) = normalize(event) {
                        let message = BridgeMessage::from_event(native);
                        if ingest_tx.send(message).is_err() {
                            warn!(%platform, "controller gone, stopping ingestion");
                            break;
                        }
                    }
                }
                None => {
                    warn!(%platform, "event stream ended, reconnecting");
                    health.set_connected(platform, false);
                    match connect_with_backoff(client, platform, health, attempt_timeout, shutdown_rx).await {
                        Ok(ConnectOutcome::Connected) => {}
                        Ok(ConnectOutcome::ShuttingDown) => break,
                        Err(_) => {
                            error!(%platform, "adapter stopped, operator intervention required");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Answer a `!ask` command on the platform it came from.
async fn handle_command(
    client: &dyn ChatClient,
    platform: Platform,
    responder: Option<&dyn Responder>,
    room_id: &str,
    prompt: &str,
) {
    let Some(responder) = responder else {
        return;
    };
    let Some(reply) = responder.respond(prompt).await else {
        return;
    };
    if let Err(e) = client.send_text(room_id, &reply).await {
        warn!(%platform, room_id, error = %e, "failed to send command reply");
    }
}
