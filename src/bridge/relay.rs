//! Relay coordinator.
//!
//! A bounded work queue per target platform, each drained by exactly
//! one worker task. Single-worker draining is what preserves delivery
//! order per (source room -> target room) pair; separate queues per
//! platform keep a dead target from head-of-line blocking the healthy
//! direction.
//!
//! Backpressure policy: `enqueue` never blocks. A full queue hands the
//! message back and the controller marks it failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::adapter::Outbound;
use crate::common::error::RelayError;
use crate::common::types::Platform;
use crate::common::BridgeMessage;

/// Returned by `enqueue` when the target queue is full; carries the
/// message back so the caller can record the failure.
#[derive(Debug)]
pub struct QueueFull(pub BridgeMessage);

/// The result of one delivery attempt, reported back to the controller.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub message: BridgeMessage,
    pub result: Result<(), RelayError>,
    /// Delivery completion time, recorded by the worker so persisted
    /// `relayed_at` values follow actual send order.
    pub completed_at: DateTime<Utc>,
}

/// Receiving halves of the per-target queues, consumed by the workers.
pub struct RelayQueues {
    pub matrix_rx: mpsc::Receiver<BridgeMessage>,
    pub delta_rx: mpsc::Receiver<BridgeMessage>,
}

/// Enqueue side of the relay queues.
pub struct RelayCoordinator {
    matrix_tx: mpsc::Sender<BridgeMessage>,
    delta_tx: mpsc::Sender<BridgeMessage>,
}

impl RelayCoordinator {
    /// Create the per-target queues with the given capacity each.
    pub fn new(capacity: usize) -> (Self, RelayQueues) {
        let (matrix_tx, matrix_rx) = mpsc::channel(capacity.max(1));
        let (delta_tx, delta_rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                matrix_tx,
                delta_tx,
            },
            RelayQueues {
                matrix_rx,
                delta_rx,
            },
        )
    }

    /// Hand a resolved message to its target platform's queue.
    ///
    /// Non-blocking; FIFO order per queue is what the ordering
    /// guarantee rests on.
    pub fn enqueue(&self, message: BridgeMessage) -> Result<(), QueueFull> {
        let tx = match message.target_platform {
            Platform::Matrix => &self.matrix_tx,
            Platform::Delta => &self.delta_tx,
        };
        tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(message) => QueueFull(message),
            mpsc::error::TrySendError::Closed(message) => QueueFull(message),
        })
    }
}

/// Worker loop for one target platform.
///
/// Dequeues, invokes the target adapter, and reports each outcome to
/// the controller's outcome channel. On shutdown, queued items are
/// drained best-effort within `grace`; the remainder is failed with
/// reason "shutdown".
pub async fn run_worker(
    adapter: Arc<dyn Outbound>,
    mut rx: mpsc::Receiver<BridgeMessage>,
    outcome_tx: mpsc::UnboundedSender<DeliveryOutcome>,
    mut shutdown_rx: watch::Receiver<bool>,
    grace: Duration,
) {
    let platform = adapter.platform();
    info!(%platform, "relay worker started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    drain_on_shutdown(&*adapter, &mut rx, &outcome_tx, grace).await;
                    break;
                }
            }
            maybe = rx.recv() => match maybe {
                Some(message) => deliver_one(&*adapter, message, &outcome_tx).await,
                None => break,
            },
        }
    }

    info!(%platform, "relay worker stopped");
}

async fn deliver_one(
    adapter: &dyn Outbound,
    message: BridgeMessage,
    outcome_tx: &mpsc::UnboundedSender<DeliveryOutcome>,
) {
    let result = adapter.deliver(&message).await.map_err(RelayError::from);
    if outcome_tx
        .send(DeliveryOutcome {
            message,
            result,
            completed_at: Utc::now(),
        })
        .is_err()
    {
        warn!("outcome channel closed, delivery result dropped");
    }
}

async fn drain_on_shutdown(
    adapter: &dyn Outbound,
    rx: &mut mpsc::Receiver<BridgeMessage>,
    outcome_tx: &mpsc::UnboundedSender<DeliveryOutcome>,
    grace: Duration,
) {
    let platform = adapter.platform();
    info!(%platform, grace_secs = grace.as_secs_f64(), "draining relay queue");

    let deadline = Instant::now() + grace;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, rx.recv()).await {
            Ok(Some(message)) => deliver_one(adapter, message, outcome_tx).await,
            // Queue closed and empty; nothing left to fail.
            Ok(None) => return,
            Err(_) => break,
        }
    }

    // Grace expired: fail whatever is still queued.
    rx.close();
    let mut abandoned = 0usize;
    while let Ok(message) = rx.try_recv() {
        abandoned += 1;
        let _ = outcome_tx.send(DeliveryOutcome {
            message,
            result: Err(RelayError::Shutdown),
            completed_at: Utc::now(),
        });
    }
    if abandoned > 0 {
        warn!(%platform, abandoned, "shutdown grace expired with messages still queued");
    }
}
