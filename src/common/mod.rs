//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod types;

// Re-export message types from messages module
pub use messages::{content_hash, BridgeMessage, NativeEvent};
pub use types::{
    BridgeConfigRecord, BridgeStateRecord, BridgeStats, Platform, RelayStatus, RoomMapping,
    UserMapping,
};
