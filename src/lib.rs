//! Courier - Matrix-Delta Chat bridge.
//!
//! Relays messages bidirectionally between mapped Matrix rooms and
//! Delta Chat email groups: normalization, deduplication, user/room
//! mapping, and relay delivery with persisted state. The protocol
//! client libraries are external; inject them through
//! [`adapter::ChatClient`].

pub mod adapter;
pub mod bridge;
pub mod common;
pub mod config;
pub mod store;
