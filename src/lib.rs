//! Receiver endpoint for the SoulFire cast dashboard.
//!
//! A controller connects over a custom-message namespace, proves it saw the
//! receiver's live nonce, and then streams periodic metrics that are kept in
//! a bounded history for display.

pub mod api;
pub mod config;
pub mod handshake;
pub mod host;
pub mod ingest;
pub mod phase;
pub mod protocol;
pub mod receiver;
pub mod session;
pub mod summary;
pub mod transport;
pub mod types;
