//! Delta Chat (email) adapter.
//!
//! Wraps a chat-over-email account behind the `ChatClient` boundary.
//! Email bodies carry baggage a room message never has (quoted
//! history, signatures), so normalization here strips it before the
//! message enters the bridge.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::channels::AdapterChannels;
use crate::bridge::state::BridgeHealth;
use crate::common::error::{SendError, SendResult, UnavailableError};
use crate::common::types::Platform;
use crate::common::BridgeMessage;
use crate::common::NativeEvent;
use crate::config::types::DeltaConfig;

use super::{
    connect_with_backoff, format, ingest_loop, ChatClient, ClientEvent, ConnectOutcome, Outbound,
    Responder,
};

/// Build the native Delta Chat client.
///
/// No Delta Chat core is linked into this build; inject a `ChatClient`
/// implementation through `DeltaAdapter::new` instead.
pub fn native_client(_config: &DeltaConfig) -> Result<Arc<dyn ChatClient>, UnavailableError> {
    Err(UnavailableError {
        platform: Platform::Delta,
        reason: "this build does not link a Delta Chat core".to_string(),
    })
}

/// Adapter for the email side of the bridge.
pub struct DeltaAdapter {
    client: Arc<dyn ChatClient>,
    health: Arc<BridgeHealth>,
    responder: Option<Arc<dyn Responder>>,
    connect_timeout: Duration,
}

impl DeltaAdapter {
    pub fn new(
        client: Arc<dyn ChatClient>,
        health: Arc<BridgeHealth>,
        responder: Option<Arc<dyn Responder>>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            client,
            health,
            responder,
            connect_timeout,
        }
    }

    /// Connect, then consume the event stream until shutdown or a
    /// terminal auth failure.
    pub async fn run(&self, mut channels: AdapterChannels) {
        match connect_with_backoff(
            &*self.client,
            Platform::Delta,
            &self.health,
            self.connect_timeout,
            &mut channels.shutdown_rx,
        )
        .await
        {
            Ok(ConnectOutcome::Connected) => {}
            Ok(ConnectOutcome::ShuttingDown) | Err(_) => return,
        }

        ingest_loop(
            &*self.client,
            Platform::Delta,
            &self.health,
            self.responder.as_deref(),
            self.connect_timeout,
            normalize_event,
            &channels.ingest_tx,
            &mut channels.shutdown_rx,
        )
        .await;

        self.health.set_connected(Platform::Delta, false);
    }
}

#[async_trait]
impl Outbound for DeltaAdapter {
    fn platform(&self) -> Platform {
        Platform::Delta
    }

    async fn deliver(&self, message: &BridgeMessage) -> SendResult<()> {
        let group_id = message
            .target_room_id
            .as_deref()
            .ok_or_else(|| SendError::Client {
                message: "message has no target group".to_string(),
            })?;
        let rendered = format::render_relayed(message);
        self.client.send_text(group_id, &rendered).await
    }
}

/// Normalize an incoming email-group message.
///
/// Quoted history and signatures are stripped; a message that is
/// nothing but quotes is dropped. Display name falls back to the
/// address localpart.
fn normalize_event(event: ClientEvent) -> Option<NativeEvent> {
    let text = clean_body(&event.text);
    if text.is_empty() {
        return None;
    }
    let sender_display_name = if event.sender_display_name.trim().is_empty() {
        addr_localpart(&event.sender_id).to_string()
    } else {
        event.sender_display_name.clone()
    };
    Some(NativeEvent {
        platform: Platform::Delta,
        sender_id: event.sender_id,
        sender_display_name,
        room_id: event.room_id,
        text,
        occurred_at: event.occurred_at,
    })
}

/// Strip quoted reply lines, attribution lines, and everything after
/// the "-- " signature delimiter.
fn clean_body(body: &str) -> String {
    let mut kept = Vec::new();
    for line in body.lines() {
        if line == "-- " || line.trim_end() == "--" {
            break;
        }
        if line.trim_start().starts_with('>') {
            continue;
        }
        if line.starts_with("On ") && line.trim_end().ends_with("wrote:") {
            continue;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}

/// "bob@example.org" -> "bob".
fn addr_localpart(addr: &str) -> &str {
    addr.split('@').next().unwrap_or(addr)
}
