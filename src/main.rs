//! Courier - Matrix-Delta Chat bridge
//!
//! Relays messages bidirectionally between mapped Matrix rooms and
//! Delta Chat email groups so participants on either platform can
//! converse as if they shared a room.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::signal;
use tracing::{debug, error, info, warn};

use courier::adapter::{delta, matrix, DeltaAdapter, MatrixAdapter, Outbound};
use courier::bridge::{relay, BridgeController, BridgeHealth, ChannelBundle, RelayCoordinator};
use courier::common::types::{BridgeConfigRecord, Platform};
use courier::config::{env::get_config_path, load_and_validate};
use courier::store::{MemoryRepository, Repository, SharedRepository, SqliteRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Courier v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Matrix account: {}", config.matrix.user_id);
    info!("  Homeserver: {}", config.matrix.homeserver);
    info!("  Delta address: {}", config.delta.addr);
    info!("  Seed room mappings: {}", config.room_mappings().len());

    // ============================================================
    // Open the persistence repository
    // ============================================================
    let repo: SharedRepository = match config.storage.as_ref().and_then(|s| s.path.as_deref()) {
        Some(path) => {
            info!("Opening database at {}...", path);
            Arc::new(SqliteRepository::open(path).await.map_err(|e| {
                error!("Failed to open repository: {}", e);
                e
            })?)
        }
        None => {
            warn!("No storage.path configured - relay history will not survive restarts");
            Arc::new(MemoryRepository::new())
        }
    };

    // A repository that cannot answer at boot is fatal. The config
    // record is created once; a deployment disabled there stays off
    // until an operator re-enables it.
    let bridge_record = match repo.get_bridge_config().await? {
        Some(existing) if !existing.enabled => {
            error!("Bridge instance '{}' is disabled in the repository", existing.id);
            anyhow::bail!("bridge disabled");
        }
        Some(existing) => BridgeConfigRecord {
            matrix_account: config.matrix.user_id.clone(),
            delta_addr: config.delta.addr.clone(),
            updated_at: Utc::now(),
            ..existing
        },
        None => BridgeConfigRecord {
            id: "default".to_string(),
            matrix_account: config.matrix.user_id.clone(),
            delta_addr: config.delta.addr.clone(),
            enabled: true,
            updated_at: Utc::now(),
        },
    };
    repo.save_bridge_config(&bridge_record).await?;

    // ============================================================
    // Build the bridge core
    // ============================================================
    let health = Arc::new(BridgeHealth::new());
    let channels = ChannelBundle::new();
    let (coordinator, queues) = RelayCoordinator::new(config.queue_capacity());

    let controller = Arc::new(BridgeController::new(
        Arc::clone(&repo),
        Arc::clone(&health),
        coordinator,
        config.dedup_capacity(),
    ));

    // Seed mappings from config, then warm the caches.
    for mapping in config.room_mappings() {
        controller.upsert_room_mapping(&mapping).await?;
    }
    for mapping in config.user_mappings() {
        controller.upsert_user_mapping(&mapping).await?;
    }
    controller.refresh_mappings().await?;

    // ============================================================
    // Construct adapters over the native protocol clients
    // ============================================================
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs());

    let matrix_client = matrix::native_client(&config.matrix).map_err(|e| {
        error!("{}", e);
        error!("Courier needs a protocol client wired in to run; see the adapter module docs.");
        e
    })?;
    let delta_client = delta::native_client(&config.delta).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let matrix_adapter = Arc::new(MatrixAdapter::new(
        matrix_client,
        Arc::clone(&health),
        None,
        connect_timeout,
    ));
    let delta_adapter = Arc::new(DeltaAdapter::new(
        delta_client,
        Arc::clone(&health),
        None,
        connect_timeout,
    ));

    // ============================================================
    // Spawn ingestion, controller, worker, and maintenance tasks
    // ============================================================
    let grace = Duration::from_secs(config.shutdown_grace_secs());

    let matrix_ingest = {
        let adapter = Arc::clone(&matrix_adapter);
        let adapter_channels = channels.adapters.clone_for_adapter();
        tokio::spawn(async move {
            adapter.run(adapter_channels).await;
            info!("Matrix ingestion task ended");
        })
    };

    let delta_ingest = {
        let adapter = Arc::clone(&delta_adapter);
        let adapter_channels = channels.adapters.clone_for_adapter();
        tokio::spawn(async move {
            adapter.run(adapter_channels).await;
            info!("Delta ingestion task ended");
        })
    };

    let matrix_outbound: Arc<dyn Outbound> = matrix_adapter;
    let delta_outbound: Arc<dyn Outbound> = delta_adapter;
    let mut matrix_worker = tokio::spawn(relay::run_worker(
        matrix_outbound,
        queues.matrix_rx,
        channels.workers.outcome_tx.clone(),
        channels.workers.shutdown_rx.clone(),
        grace,
    ));
    let mut delta_worker = tokio::spawn(relay::run_worker(
        delta_outbound,
        queues.delta_rx,
        channels.workers.outcome_tx.clone(),
        channels.workers.shutdown_rx.clone(),
        grace,
    ));

    // Task: normalized messages -> controller state machine
    let ingest_task = {
        let controller = Arc::clone(&controller);
        let mut ingest_rx = channels.controller.ingest_rx;
        tokio::spawn(async move {
            while let Some(message) = ingest_rx.recv().await {
                controller.handle_incoming(message).await;
            }
            info!("Controller ingest task ended");
        })
    };

    // Task: delivery outcomes -> terminal statuses
    let outcome_task = {
        let controller = Arc::clone(&controller);
        let mut outcome_rx = channels.controller.outcome_rx;
        tokio::spawn(async move {
            while let Some(outcome) = outcome_rx.recv().await {
                controller.record_outcome(outcome).await;
            }
            info!("Outcome task ended");
        })
    };

    // Task: periodic maintenance (history cleanup, cache refresh,
    // state persistence, stats line)
    let maintenance_task = {
        let controller = Arc::clone(&controller);
        let repo = Arc::clone(&repo);
        let health = Arc::clone(&health);
        let mut shutdown_rx = channels.workers.shutdown_rx.clone();
        let interval = Duration::from_secs(config.maintenance_interval_secs());
        let retention = chrono::Duration::days(config.cleanup_after_days());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick completes immediately
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                match repo.cleanup_older_than(retention).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "cleaned up old relay history"),
                    Err(e) => warn!("History cleanup failed: {}", e),
                }

                if let Err(e) = controller.refresh_mappings().await {
                    warn!("Mapping cache refresh failed: {}", e);
                }

                for platform in [Platform::Matrix, Platform::Delta] {
                    if let Err(e) = repo.update_bridge_state(&health.snapshot(platform)).await {
                        debug!(%platform, "Bridge state persistence failed: {}", e);
                    }
                }

                let stats = controller.stats().await;
                match serde_json::to_string(&stats) {
                    Ok(json) => info!(stats = %json, "bridge stats"),
                    Err(e) => warn!("Failed to serialize stats: {}", e),
                }
            }
            info!("Maintenance task ended");
        })
    };

    // ============================================================
    // Run until a task dies or a shutdown signal arrives
    // ============================================================
    let shutdown_tx = channels.control.shutdown_tx;

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - draining relay queues...");
            true
        }
        _ = matrix_ingest => false,
        _ = delta_ingest => false,
        _ = &mut matrix_worker => false,
        _ = &mut delta_worker => false,
    };

    if shutdown {
        // Signal everything; workers drain in-flight items within the
        // grace period and fail the rest with reason "shutdown".
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (tasks already exited): {}", e);
        }
        let deadline = grace + Duration::from_secs(1);
        for (name, worker) in [("matrix", &mut matrix_worker), ("delta", &mut delta_worker)] {
            match tokio::time::timeout(deadline, worker).await {
                Ok(Ok(())) => info!("{} relay worker drained", name),
                Ok(Err(e)) => warn!("{} relay worker panicked: {}", name, e),
                Err(_) => warn!("{} relay worker drain timed out", name),
            }
        }
    }

    ingest_task.abort();
    outcome_task.abort();
    maintenance_task.abort();

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
