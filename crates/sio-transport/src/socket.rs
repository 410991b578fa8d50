//! Handles given to application code for one connected socket.
//!
//! A [`Socket`] does not own the WebSocket. It pushes encoded engine frames
//! onto the session's outbound queue, which the session loop drains in
//! order. Once the session is gone every send fails with
//! [`TransportError::ConnectionClosed`].

use std::sync::Arc;

use serde_json::Value;
use sio_protocol::{DEFAULT_NAMESPACE, EnginePacket, Packet, events::is_reserved};
use tokio::sync::mpsc;

use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct Socket {
    id: Arc<str>,
    nsp: Arc<str>,
    outbound: mpsc::UnboundedSender<String>,
}

impl Socket {
    pub(crate) fn new(id: &str, nsp: &str, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: id.into(),
            nsp: nsp.into(),
            outbound,
        }
    }

    /// A socket on the default namespace that is not attached to any
    /// session. Frames it sends arrive, encoded, on the returned receiver.
    pub fn detached(id: &str) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, DEFAULT_NAMESPACE, tx), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> &str {
        &self.nsp
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Emit `event` with a single argument to this socket only.
    pub fn emit(&self, event: &str, data: Value) -> Result<(), TransportError> {
        if is_reserved(event) {
            return Err(TransportError::ReservedEvent(event.to_string()));
        }
        self.send_packet(&Packet::event(self.nsp.as_ref(), event, vec![data], None))
    }

    pub(crate) fn send_packet(&self, packet: &Packet) -> Result<(), TransportError> {
        self.send_frame(EnginePacket::message(packet.encode()).encode())
    }

    pub(crate) fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed {
                socket_id: self.id.to_string(),
            })
    }
}

/// One-shot reply slot for an event the sender asked to be acknowledged.
///
/// `send` consumes the handle, so an ack is delivered at most once.
#[derive(Debug)]
pub struct AckHandle {
    id: u64,
    socket: Socket,
}

impl AckHandle {
    pub fn new(id: u64, socket: Socket) -> Self {
        Self { id, socket }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn send(self, args: Vec<Value>) -> Result<(), TransportError> {
        self.socket
            .send_packet(&Packet::ack(self.socket.namespace(), self.id, args))
    }
}

/// An inbound application event.
#[derive(Debug)]
pub struct Event {
    pub name: String,
    pub args: Vec<Value>,
    pub ack: Option<AckHandle>,
}

impl Event {
    pub fn new(name: impl Into<String>, args: Vec<Value>, ack: Option<AckHandle>) -> Self {
        Self {
            name: name.into(),
            args,
            ack,
        }
    }
}
