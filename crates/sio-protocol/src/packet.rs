//! Socket.IO v5 packets.
//!
//! A packet is encoded as
//! `<type>[<attachments>-][<namespace>,][<ack id>][<json data>]`,
//! where the namespace is omitted for `/` and the attachment count only
//! appears on binary packets.

use serde_json::{Value, json};

use crate::error::ProtocolError;

/// The namespace every client lands in; the only one this server serves.
pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl PacketType {
    pub fn digit(&self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    pub fn from_digit(c: char) -> Result<Self, ProtocolError> {
        Ok(match c {
            '0' => Self::Connect,
            '1' => Self::Disconnect,
            '2' => Self::Event,
            '3' => Self::Ack,
            '4' => Self::ConnectError,
            '5' => Self::BinaryEvent,
            '6' => Self::BinaryAck,
            other => return Err(ProtocolError::UnknownPacketType(other)),
        })
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: PacketType,
    pub nsp: String,
    pub id: Option<u64>,
    pub data: Option<Value>,
}

impl Packet {
    fn new(kind: PacketType, nsp: impl Into<String>, id: Option<u64>, data: Option<Value>) -> Self {
        Self {
            kind,
            nsp: nsp.into(),
            id,
            data,
        }
    }

    /// Server reply to a namespace CONNECT, carrying the socket id.
    pub fn connect(nsp: impl Into<String>, sid: &str) -> Self {
        Self::new(PacketType::Connect, nsp, None, Some(json!({ "sid": sid })))
    }

    pub fn connect_error(nsp: impl Into<String>, message: &str) -> Self {
        Self::new(
            PacketType::ConnectError,
            nsp,
            None,
            Some(json!({ "message": message })),
        )
    }

    pub fn disconnect(nsp: impl Into<String>) -> Self {
        Self::new(PacketType::Disconnect, nsp, None, None)
    }

    /// An EVENT packet: data is `[name, args...]`.
    pub fn event(nsp: impl Into<String>, name: &str, args: Vec<Value>, id: Option<u64>) -> Self {
        let mut data = Vec::with_capacity(args.len() + 1);
        data.push(Value::String(name.to_string()));
        data.extend(args);
        Self::new(PacketType::Event, nsp, id, Some(Value::Array(data)))
    }

    pub fn ack(nsp: impl Into<String>, id: u64, args: Vec<Value>) -> Self {
        Self::new(PacketType::Ack, nsp, Some(id), Some(Value::Array(args)))
    }

    pub fn is_default_namespace(&self) -> bool {
        self.nsp == DEFAULT_NAMESPACE
    }

    /// Split an EVENT packet into its name and arguments.
    pub fn into_event(self) -> Result<(String, Vec<Value>), ProtocolError> {
        if self.kind != PacketType::Event {
            return Err(ProtocolError::payload("event", "not an event packet"));
        }
        let Some(Value::Array(mut items)) = self.data else {
            return Err(ProtocolError::payload("event", "expected an array"));
        };
        if items.is_empty() {
            return Err(ProtocolError::payload("event", "missing event name"));
        }
        match items.remove(0) {
            Value::String(name) => Ok((name, items)),
            _ => Err(ProtocolError::payload("event", "event name must be a string")),
        }
    }

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let mut rest = body;
        let kind = match rest.chars().next() {
            Some(c) => PacketType::from_digit(c)?,
            None => return Err(ProtocolError::Empty),
        };
        rest = &rest[1..];

        if kind.is_binary() {
            // Still validate the header so a garbled frame is reported as such.
            let count = rest
                .split_once('-')
                .map(|(count, _)| count)
                .ok_or(ProtocolError::InvalidAttachments)?;
            if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ProtocolError::InvalidAttachments);
            }
            return Err(ProtocolError::BinaryUnsupported);
        }

        let nsp = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let nsp = &rest[..end];
            rest = rest.get(end + 1..).unwrap_or_default();
            nsp.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        let id = if digits > 0 {
            let raw = &rest[..digits];
            rest = &rest[digits..];
            Some(
                raw.parse::<u64>()
                    .map_err(|_| ProtocolError::InvalidAckId(raw.to_string()))?,
            )
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(rest)?)
        };

        let packet = Self::new(kind, nsp, id, data);
        packet.check_shape()?;
        Ok(packet)
    }

    fn check_shape(&self) -> Result<(), ProtocolError> {
        match (self.kind, &self.data) {
            (PacketType::Connect, None | Some(Value::Object(_))) => Ok(()),
            (PacketType::Connect, _) => Err(ProtocolError::payload("connect", "expected an object")),
            (PacketType::Disconnect, None) => Ok(()),
            (PacketType::Disconnect, _) => Err(ProtocolError::payload("disconnect", "unexpected data")),
            (PacketType::Event, Some(Value::Array(items))) => match items.first() {
                Some(Value::String(_)) => Ok(()),
                _ => Err(ProtocolError::payload("event", "event name must be a string")),
            },
            (PacketType::Event, _) => Err(ProtocolError::payload("event", "expected an array")),
            (PacketType::Ack, Some(Value::Array(_))) if self.id.is_some() => Ok(()),
            (PacketType::Ack, _) => Err(ProtocolError::payload("ack", "expected an id and an array")),
            (PacketType::ConnectError, Some(Value::Object(_) | Value::String(_))) => Ok(()),
            (PacketType::ConnectError, _) => {
                Err(ProtocolError::payload("connect error", "expected an object or string"))
            }
            (PacketType::BinaryEvent | PacketType::BinaryAck, _) => Err(ProtocolError::BinaryUnsupported),
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.digit());
        if self.nsp != DEFAULT_NAMESPACE {
            out.push_str(&self.nsp);
            out.push(',');
        }
        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }
}
