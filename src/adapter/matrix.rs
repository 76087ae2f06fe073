//! Matrix adapter.
//!
//! Wraps a Matrix session behind the `ChatClient` boundary and
//! normalizes room message events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::channels::AdapterChannels;
use crate::bridge::state::BridgeHealth;
use crate::common::error::{SendError, SendResult, UnavailableError};
use crate::common::types::Platform;
use crate::common::NativeEvent;
use crate::common::BridgeMessage;
use crate::config::types::MatrixConfig;

use super::{
    connect_with_backoff, format, ingest_loop, ChatClient, ClientEvent, ConnectOutcome, Outbound,
    Responder,
};

/// Build the native Matrix client.
///
/// No Matrix client library is linked into this build; inject a
/// `ChatClient` implementation through `MatrixAdapter::new` instead.
pub fn native_client(_config: &MatrixConfig) -> Result<Arc<dyn ChatClient>, UnavailableError> {
    Err(UnavailableError {
        platform: Platform::Matrix,
        reason: "this build does not link a Matrix client library".to_string(),
    })
}

/// Adapter for the real-time side of the bridge.
pub struct MatrixAdapter {
    client: Arc<dyn ChatClient>,
    health: Arc<BridgeHealth>,
    responder: Option<Arc<dyn Responder>>,
    connect_timeout: Duration,
}

impl MatrixAdapter {
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
            Platform::Matrix,
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
            Platform::Matrix,
            &self.health,
            self.responder.as_deref(),
            self.connect_timeout,
            normalize_event,
            &channels.ingest_tx,
            &mut channels.shutdown_rx,
        )
        .await;

        self.health.set_connected(Platform::Matrix, false);
    }
}

#[async_trait]
impl Outbound for MatrixAdapter {
    fn platform(&self) -> Platform {
        Platform::Matrix
    }

    async fn deliver(&self, message: &BridgeMessage) -> SendResult<()> {
        let room_id = message
            .target_room_id
            .as_deref()
            .ok_or_else(|| SendError::Client {
                message: "message has no target room".to_string(),
            })?;
        let rendered = format::render_relayed(message);
        self.client.send_text(room_id, &rendered).await
    }
}

/// Normalize a Matrix room event.
///
/// Empty bodies (redactions, pure-media events reduced by the client)
/// are dropped; a missing display name falls back to the user id
/// localpart.
fn normalize_event(event: ClientEvent) -> Option<NativeEvent> {
    let text = event.text.trim();
    if text.is_empty() {
        return None;
    }
    let sender_display_name = if event.sender_display_name.trim().is_empty() {
        localpart(&event.sender_id).to_string()
    } else {
        event.sender_display_name.clone()
    };
    Some(NativeEvent {
        platform: Platform::Matrix,
        sender_id: event.sender_id,
        sender_display_name,
        room_id: event.room_id,
        text: text.to_string(),
        occurred_at: event.occurred_at,
    })
}

/// "@alice:example.org" -> "alice".
fn localpart(user_id: &str) -> &str {
    let stripped = user_id.strip_prefix('@').unwrap_or(user_id);
    stripped.split(':').next().unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelBundle;
    use crate::common::error::ConnResult;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;

    struct FakeClient {
        self_id: String,
        events: AsyncMutex<VecDeque<ClientEvent>>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeClient {
        fn new(self_id: &str, events: Vec<ClientEvent>) -> Self {
            Self {
                self_id: self_id.to_string(),
                events: AsyncMutex::new(events.into()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for FakeClient {
        async fn connect(&self) -> ConnResult<()> {
            Ok(())
        }

        async fn next_event(&self) -> Option<ClientEvent> {
            let next = self.events.lock().await.pop_front();
            match next {
                Some(event) => Some(event),
                // Stay pending rather than reporting connection loss;
                // tests end the loop via the shutdown signal.
                None => std::future::pending().await,
            }
        }

        async fn send_text(&self, room_id: &str, text: &str) -> SendResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((room_id.to_string(), text.to_string()));
            Ok(())
        }

        fn self_id(&self) -> &str {
            &self.self_id
        }
    }

    struct PingResponder;

    #[async_trait]
    impl Responder for PingResponder {
        async fn respond(&self, prompt: &str) -> Option<String> {
            Some(format!("echo: {}", prompt))
        }
    }

    fn event(sender: &str, text: &str) -> ClientEvent {
        ClientEvent {
            sender_id: sender.to_string(),
            sender_display_name: String::new(),
            room_id: "!general:example.org".to_string(),
            text: text.to_string(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_localpart() {
        assert_eq!(localpart("@alice:example.org"), "alice");
        assert_eq!(localpart("alice"), "alice");
    }

    #[test]
    fn test_normalize_drops_empty_bodies() {
        assert!(normalize_event(event("@a:x", "   ")).is_none());
        assert!(normalize_event(event("@a:x", "")).is_none());
    }

    #[test]
    fn test_normalize_display_name_fallback() {
        let native = normalize_event(event("@alice:example.org", "hi")).unwrap();
        assert_eq!(native.sender_display_name, "alice");
        assert_eq!(native.platform, Platform::Matrix);

        let mut with_name = event("@alice:example.org", "hi");
        with_name.sender_display_name = "Alice L.".to_string();
        let native = normalize_event(with_name).unwrap();
        assert_eq!(native.sender_display_name, "Alice L.");
    }

    #[tokio::test]
    async fn test_deliver_renders_to_target_room() {
        let client = Arc::new(FakeClient::new("@bridge:example.org", Vec::new()));
        let adapter = MatrixAdapter::new(
            client.clone(),
            Arc::new(BridgeHealth::new()),
            None,
            Duration::from_secs(30),
        );

        let mut message = BridgeMessage::from_event(NativeEvent {
            platform: Platform::Delta,
            sender_id: "bob@example.org".to_string(),
            sender_display_name: "bob@example.org".to_string(),
            room_id: "grp-1".to_string(),
            text: "hello".to_string(),
            occurred_at: Utc::now(),
        });
        message.target_room_id = Some("!general:example.org".to_string());

        adapter.deliver(&message).await.unwrap();

        let sent = client.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "!general:example.org");
        assert!(sent[0].1.contains("[EMAIL] bob@example.org:"));
        assert!(sent[0].1.contains("hello"));
    }

    #[tokio::test]
    async fn test_deliver_without_target_room_is_a_client_error() {
        let client = Arc::new(FakeClient::new("@bridge:example.org", Vec::new()));
        let adapter = MatrixAdapter::new(
            client,
            Arc::new(BridgeHealth::new()),
            None,
            Duration::from_secs(30),
        );

        let message = BridgeMessage::from_event(NativeEvent {
            platform: Platform::Delta,
            sender_id: "bob@example.org".to_string(),
            sender_display_name: "bob".to_string(),
            room_id: "grp-1".to_string(),
            text: "hello".to_string(),
            occurred_at: Utc::now(),
        });

        assert!(adapter.deliver(&message).await.is_err());
    }

    #[tokio::test]
    async fn test_run_filters_self_and_answers_commands() {
        let client = Arc::new(FakeClient::new(
            "@bridge:example.org",
            vec![
                // Our own delivery echoed back: must be dropped.
                event("@bridge:example.org", "🖥️ **[MATRIX] alice:**\nhi"),
                // A responder command: answered locally, not relayed.
                event("@alice:example.org", "!ask how do I join?"),
                // An ordinary message: relayed.
                event("@alice:example.org", "good morning"),
            ],
        ));
        let health = Arc::new(BridgeHealth::new());
        let adapter = Arc::new(MatrixAdapter::new(
            client.clone(),
            health.clone(),
            Some(Arc::new(PingResponder)),
            Duration::from_secs(30),
        ));

        let mut bundle = ChannelBundle::new();
        let adapter_channels = bundle.adapters.clone_for_adapter();
        let task = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.run(adapter_channels).await })
        };

        // Only the ordinary message reaches the controller, which also
        // proves the command and the self-echo were handled first.
        let relayed = bundle.controller.ingest_rx.recv().await.unwrap();
        assert_eq!(relayed.text, "good morning");
        assert_eq!(relayed.source_platform, Platform::Matrix);
        assert!(health.is_connected(Platform::Matrix));

        let sent = client.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "echo: how do I join?");

        bundle.control.shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert!(!health.is_connected(Platform::Matrix));
    }
}
