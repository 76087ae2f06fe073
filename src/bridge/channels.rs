//! Bridge channel management.
//!
//! Groups the communication channels between the adapters, the
//! controller, and the relay workers, so construction hands each task
//! exactly the endpoints it needs.

use tokio::sync::{mpsc, watch};

use crate::bridge::relay::DeliveryOutcome;
use crate::common::BridgeMessage;

/// Channels handed to each platform adapter's ingestion task.
pub struct AdapterChannels {
    /// Sender for normalized messages going to the controller.
    pub ingest_tx: mpsc::UnboundedSender<BridgeMessage>,
    /// Receiver for the shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

impl AdapterChannels {
    pub fn clone_for_adapter(&self) -> Self {
        Self {
            ingest_tx: self.ingest_tx.clone(),
            shutdown_rx: self.shutdown_rx.clone(),
        }
    }
}

/// Channels the controller's loops consume.
pub struct ControllerChannels {
    /// Receiver for normalized messages from both adapters.
    pub ingest_rx: mpsc::UnboundedReceiver<BridgeMessage>,
    /// Receiver for delivery outcomes from the relay workers.
    pub outcome_rx: mpsc::UnboundedReceiver<DeliveryOutcome>,
}

/// Channels handed to each relay worker.
pub struct WorkerChannels {
    /// Sender for delivery outcomes (workers report here).
    pub outcome_tx: mpsc::UnboundedSender<DeliveryOutcome>,
    /// Receiver for the shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created for one bridge instance.
pub struct ChannelBundle {
    pub adapters: AdapterChannels,
    pub controller: ControllerChannels,
    pub workers: WorkerChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create a new set of bridge channels.
    ///
    /// Ingest and outcome channels are unbounded; backpressure lives in
    /// the relay coordinator's bounded per-target queues.
    pub fn new() -> Self {
        let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            adapters: AdapterChannels {
                ingest_tx,
                shutdown_rx: shutdown_rx.clone(),
            },
            controller: ControllerChannels {
                ingest_rx,
                outcome_rx,
            },
            workers: WorkerChannels {
                outcome_tx,
                shutdown_rx,
            },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Platform;
    use crate::common::NativeEvent;
    use chrono::Utc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_ingest_flow() {
        let mut bundle = ChannelBundle::new();

        let message = BridgeMessage::from_event(NativeEvent {
            platform: Platform::Matrix,
            sender_id: "@a:x".to_string(),
            sender_display_name: "a".to_string(),
            room_id: "!r:x".to_string(),
            text: "hi".to_string(),
            occurred_at: Utc::now(),
        });
        assert_ok!(bundle.adapters.ingest_tx.send(message));

        let received = bundle.controller.ingest_rx.recv().await.unwrap();
        assert_eq!(received.text, "hi");
    }

    #[tokio::test]
    async fn test_shutdown_signal_reaches_all_receivers() {
        let bundle = ChannelBundle::new();
        let mut adapter_rx = bundle.adapters.shutdown_rx.clone();
        let mut worker_rx = bundle.workers.shutdown_rx.clone();

        bundle.control.shutdown_tx.send(true).unwrap();

        adapter_rx.changed().await.unwrap();
        assert!(*adapter_rx.borrow());
        worker_rx.changed().await.unwrap();
        assert!(*worker_rx.borrow());
    }
}
