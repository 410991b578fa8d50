//! Socket.IO Transport Layer
//!
//! Serves Engine.IO v4 sessions over WebSocket and hosts one Socket.IO
//! socket per session on the default namespace. The transport handles:
//! - HTTP upgrade and handshake query validation
//! - Connection lifecycle (open, namespace connect, close)
//! - Heartbeat ping / pong and stale session detection
//! - Packet decoding and outbound frame queueing
//!
//! Application logic plugs in through the `EventHandler` trait.

pub mod client;
pub mod error;
pub mod server;
pub mod socket;

pub use client::ClientConnection;
pub use error::TransportError;
pub use server::{EventHandler, SendErrorPolicy, TransportConfig, TransportServer};
pub use socket::{AckHandle, Event, Socket};
