//! Transport errors.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid listen address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("connection {socket_id} is closed")]
    ConnectionClosed { socket_id: String },

    #[error("event name {0:?} is reserved")]
    ReservedEvent(String),
}
