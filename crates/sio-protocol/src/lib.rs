//! Socket.IO wire protocol types.
//!
//! Two layers live here:
//! - Engine.IO v4 framing (open, ping/pong, message, close) in [`engine`]
//! - Socket.IO v5 packets (connect, event, ack, ...) in [`packet`]
//!
//! plus the handshake query/response types, event-name constants and the
//! text coercion applied to echoed payloads.

pub mod engine;
pub mod error;
pub mod events;
pub mod handshake;
pub mod packet;
pub mod payload;

pub use engine::EnginePacket;
pub use error::ProtocolError;
pub use events::Events;
pub use handshake::{EngineError, EngineErrorCode, HandshakeQuery, OpenPacket};
pub use packet::{Packet, PacketType, DEFAULT_NAMESPACE};
pub use payload::Payload;
