//! Unified bridge module for Matrix-Delta message relay.
//!
//! This module holds the core relay machinery: the controller's state
//! machine, identity/room mapping, echo suppression, and the bounded
//! relay queues.
//!
//! ## Module Structure
//!
//! - `channels`: Communication channel structures
//! - `controller`: Relay state machine (`BridgeController`)
//! - `dedup`: Bounded recent-hash set (`DedupGuard`)
//! - `mappings`: Repository-backed mapping caches (`MappingStore`)
//! - `relay`: Bounded per-target queues and workers
//! - `state`: Live connectivity state (`BridgeHealth`)

pub mod channels;
pub mod controller;
pub mod dedup;
pub mod mappings;
pub mod relay;
pub mod state;

// Re-export main types for convenience
pub use channels::ChannelBundle;
pub use controller::BridgeController;
pub use dedup::DedupGuard;
pub use mappings::MappingStore;
pub use relay::{DeliveryOutcome, RelayCoordinator, RelayQueues};
pub use state::BridgeHealth;
