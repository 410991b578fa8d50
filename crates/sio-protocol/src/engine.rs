//! Engine.IO v4 framing.
//!
//! Each WebSocket text frame carries exactly one engine packet: a single
//! type digit followed by an optional string body.
//!
//! | Digit | Packet  | Body                     |
//! |-------|---------|--------------------------|
//! | `0`   | open    | handshake JSON           |
//! | `1`   | close   | none                     |
//! | `2`   | ping    | optional probe data      |
//! | `3`   | pong    | echoed probe data        |
//! | `4`   | message | Socket.IO packet         |
//! | `5`   | upgrade | none                     |
//! | `6`   | noop    | none                     |

use crate::error::ProtocolError;
use crate::handshake::OpenPacket;

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenPacket),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let body = chars.as_str();
        let data = || (!body.is_empty()).then(|| body.to_string());

        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(body)?),
            '1' => Self::Close,
            '2' => Self::Ping(data()),
            '3' => Self::Pong(data()),
            '4' => Self::Message(body.to_string()),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            other => return Err(ProtocolError::UnknownEngineType(other)),
        })
    }

    pub fn encode(&self) -> String {
        match self {
            // OpenPacket only holds strings and integers
            Self::Open(open) => format!("0{}", serde_json::to_string(open).unwrap_or_default()),
            Self::Close => "1".into(),
            Self::Ping(data) => format!("2{}", data.as_deref().unwrap_or_default()),
            Self::Pong(data) => format!("3{}", data.as_deref().unwrap_or_default()),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".into(),
            Self::Noop => "6".into(),
        }
    }

    /// Wrap an already-encoded Socket.IO packet in a message frame.
    pub fn message(body: impl Into<String>) -> Self {
        Self::Message(body.into())
    }
}
