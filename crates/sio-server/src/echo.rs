//! The echo handler and its listener entry point.

use serde_json::Value;
use sio_protocol::{Events, Payload};
use sio_transport::{
    AckHandle, Event, EventHandler, Socket, TransportConfig, TransportError, TransportServer,
};
use tracing::{debug, info};

/// Values every acknowledgement is answered with, whatever the payload.
pub const ACK_VALUES: [i64; 3] = [1, 2, 3];

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoServer;

impl EchoServer {
    pub fn new() -> Self {
        Self
    }

    /// Bind the listener and start serving. No retry on failure.
    pub async fn listen(self, config: TransportConfig) -> Result<TransportServer, TransportError> {
        let server = TransportServer::start(config, self).await?;
        info!("listening on *:{}", server.port());
        Ok(server)
    }

    /// Acknowledge (if asked), log, then echo the payload as text.
    pub fn on_message(
        &self,
        socket: &Socket,
        payload: Payload,
        ack: Option<AckHandle>,
    ) -> Result<(), TransportError> {
        if let Some(ack) = ack {
            ack.send(ACK_VALUES.into_iter().map(Value::from).collect())?;
        }

        let text = payload.to_text();
        info!("data from default => {text}");
        socket.emit(Events::FROM_SERVER, Value::String(text))
    }
}

impl EventHandler for EchoServer {
    async fn on_connect(&self, socket: &Socket) {
        info!("connection default namespace");
        debug!("socket {} joined {}", socket.id(), socket.namespace());
    }

    async fn on_event(&self, socket: &Socket, event: Event) -> Result<(), TransportError> {
        match event.name.as_str() {
            Events::MSG => self.on_message(socket, Payload::from_args(event.args), event.ack),
            other => {
                debug!("Ignoring event {other:?} from {}", socket.id());
                Ok(())
            }
        }
    }
}
