//! Engine.IO handshake types.
//!
//! Protocol flow:
//!   1. Client requests `GET /socket.io/?EIO=4&transport=websocket`
//!   2. Server validates the query and upgrades to a WebSocket
//!   3. Server sends the open packet: `0{"sid":..,"pingInterval":..}`
//!   4. Client sends a Socket.IO CONNECT (`40`) for the default namespace
//!   5. Server replies `40{"sid":..}` and normal event traffic begins

use serde::{Deserialize, Serialize};

/// The only Engine.IO revision this server speaks.
pub const PROTOCOL_VERSION: &str = "4";

/// The only transport this server speaks.
pub const TRANSPORT_WEBSOCKET: &str = "websocket";

// ─────────────────────────────────────────────────────────────────────────────
// Client → Server
// ─────────────────────────────────────────────────────────────────────────────

/// Query string sent with the upgrade request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakeQuery {
    #[serde(rename = "EIO")]
    pub eio: Option<String>,
    pub transport: Option<String>,
    /// Present when a client upgrades an existing polling session.
    pub sid: Option<String>,
}

impl HandshakeQuery {
    /// Check the query against what this server supports.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.eio.as_deref() != Some(PROTOCOL_VERSION) {
            return Err(EngineError::new(EngineErrorCode::UnsupportedProtocolVersion));
        }
        if self.transport.as_deref() != Some(TRANSPORT_WEBSOCKET) {
            return Err(EngineError::new(EngineErrorCode::UnknownTransport));
        }
        // There is no polling transport, so there is never a session to upgrade.
        if self.sid.is_some() {
            return Err(EngineError::new(EngineErrorCode::UnknownSid));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server → Client
// ─────────────────────────────────────────────────────────────────────────────

/// Body of the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPacket {
    pub sid: String,
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the client has to answer a ping
    pub ping_timeout: u64,
    /// Largest accepted frame, in bytes
    pub max_payload: usize,
}

/// Engine.IO handshake error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    UnknownTransport,
    UnknownSid,
    BadRequest,
    UnsupportedProtocolVersion,
}

impl EngineErrorCode {
    pub fn code(&self) -> u8 {
        match self {
            Self::UnknownTransport => 0,
            Self::UnknownSid => 1,
            Self::BadRequest => 3,
            Self::UnsupportedProtocolVersion => 5,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownTransport => "Transport unknown",
            Self::UnknownSid => "Session ID unknown",
            Self::BadRequest => "Bad request",
            Self::UnsupportedProtocolVersion => "Unsupported protocol version",
        }
    }
}

/// JSON body returned with an HTTP 400 when the handshake is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    pub code: u8,
    pub message: String,
}

impl EngineError {
    pub fn new(code: EngineErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().into(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Engine.IO error [{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for EngineError {}
