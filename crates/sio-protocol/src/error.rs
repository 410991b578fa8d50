//! Protocol decoding errors.

use thiserror::Error;

/// Errors raised while decoding Engine.IO frames or Socket.IO packets.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,

    #[error("unknown engine packet type: {0:?}")]
    UnknownEngineType(char),

    #[error("unknown socket packet type: {0:?}")]
    UnknownPacketType(char),

    #[error("invalid attachment count")]
    InvalidAttachments,

    #[error("binary packets are not supported")]
    BinaryUnsupported,

    #[error("invalid ack id: {0}")]
    InvalidAckId(String),

    #[error("invalid packet payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload {
        kind: &'static str,
        reason: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn payload(kind: &'static str, reason: &'static str) -> Self {
        Self::InvalidPayload { kind, reason }
    }
}
