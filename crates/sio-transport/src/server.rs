//! WebSocket transport server using Axum.
//!
//! Validates the Engine.IO handshake query, upgrades to WebSocket, runs
//! the heartbeat, and routes Socket.IO packets to the event handler.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::json;
use sio_protocol::{
    DEFAULT_NAMESPACE, EngineError, EngineErrorCode, EnginePacket, HandshakeQuery, OpenPacket,
    Packet, PacketType,
};
use tokio::sync::{mpsc, watch};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::client::ClientConnection;
use crate::error::TransportError;
use crate::socket::{AckHandle, Event, Socket};

/// Trait implemented by the application to react to socket activity.
/// The transport calls these for every socket on the default namespace.
pub trait EventHandler: Send + Sync + 'static {
    /// A client connected to the default namespace. Runs before any of
    /// that socket's events are delivered.
    fn on_connect(&self, socket: &Socket) -> impl std::future::Future<Output = ()> + Send;

    /// An event arrived on `socket`. Events from one socket are delivered
    /// one at a time, in arrival order.
    fn on_event(
        &self,
        socket: &Socket,
        event: Event,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// What to do when a reply cannot be delivered to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendErrorPolicy {
    /// Log at debug level and keep the session
    #[default]
    Drop,
    /// Log at error level and close the session
    Close,
}

impl FromStr for SendErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "close" => Ok(Self::Close),
            other => Err(format!("unknown send error policy {other:?} (expected drop or close)")),
        }
    }
}

impl std::fmt::Display for SendErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Drop => "drop",
            Self::Close => "close",
        })
    }
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Mount path of the Engine.IO endpoint
    pub path: String,
    /// Interval between server pings
    pub ping_interval: Duration,
    /// How long a client has to answer a ping
    pub ping_timeout: Duration,
    /// Largest accepted text frame, in bytes
    pub max_payload: usize,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Enable CORS
    pub enable_cors: bool,
    /// Behavior when an emit or ack cannot be delivered
    pub on_send_error: SendErrorPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "0.0.0.0".into(),
            path: "/socket.io".into(),
            ping_interval: Duration::from_millis(25_000),
            ping_timeout: Duration::from_millis(20_000),
            max_payload: 1_000_000,
            max_connections: Some(1024),
            enable_cors: false,
            on_send_error: SendErrorPolicy::Drop,
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: EventHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    /// Connected client count (for health check)
    client_count: Arc<AtomicUsize>,
    /// Flips to `true` when the server stops
    shutdown_rx: watch::Receiver<bool>,
}

/// The transport server — owns the listener task and its sessions.
///
/// Dropping the server without calling [`TransportServer::stop`] also
/// shuts it down, without waiting for sessions to finish.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound address
    local_addr: SocketAddr,
    client_count: Arc<AtomicUsize>,
}

impl TransportServer {
    /// Bind the listener and start serving with the given handler.
    pub async fn start<H: EventHandler>(
        config: TransportConfig,
        handler: H,
    ) -> Result<Self, TransportError> {
        Self::start_with_handler(config, Arc::new(handler)).await
    }

    /// Like [`TransportServer::start`], for a handler that is shared with
    /// other parts of the program.
    pub async fn start_with_handler<H: EventHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        let raw_addr = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = raw_addr
            .parse()
            .map_err(|source| TransportError::InvalidAddress {
                addr: raw_addr.clone(),
                source,
            })?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        debug!("Engine.IO endpoint at ws://{local_addr}{}/", config.path.trim_end_matches('/'));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let client_count = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(AppState {
            handler,
            config,
            client_count: client_count.clone(),
            shutdown_rx: shutdown_rx.clone(),
        });

        let app = build_router(state);

        let mut server_shutdown = shutdown_rx;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.changed().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            local_addr,
            client_count,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of open sessions.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Gracefully stop the server, disconnecting every session.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Socket.IO transport stopped");
    }
}

fn build_router<H: EventHandler>(state: Arc<AppState<H>>) -> Router {
    let path = state.config.path.trim_end_matches('/').to_string();
    let enable_cors = state.config.enable_cors;

    let mut app = Router::new()
        .route(&format!("{path}/"), get(engine_handler::<H>))
        .route("/health", get(health_handler::<H>));
    if !path.is_empty() {
        app = app.route(&path, get(engine_handler::<H>));
    }

    let app = app.with_state(state);
    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn engine_handler<H: EventHandler>(
    State(state): State<Arc<AppState<H>>>,
    Query(query): Query<HandshakeQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Err(err) = query.validate() {
        debug!("Handshake rejected: {err}");
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            debug!("Upgrade rejected: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(EngineError::new(EngineErrorCode::BadRequest)),
            )
                .into_response();
        }
    };

    // Check connection limit
    if let Some(max) = state.config.max_connections {
        let current = state.client_count.load(Ordering::Relaxed);
        if current >= max {
            warn!("Connection rejected: max connections reached ({max})");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

async fn health_handler<H: EventHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.client_count.load(Ordering::Relaxed),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    ClientClose,
    NamespaceDisconnect,
    TransportClose,
    TransportError,
    PingTimeout,
    PayloadTooLarge,
    SendFailure,
    ServerShutdown,
}

impl CloseReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClose => "client close",
            Self::NamespaceDisconnect => "client namespace disconnect",
            Self::TransportClose => "transport close",
            Self::TransportError => "transport error",
            Self::PingTimeout => "ping timeout",
            Self::PayloadTooLarge => "payload too large",
            Self::SendFailure => "send failure",
            Self::ServerShutdown => "server shutting down",
        }
    }
}

enum Flow {
    Continue,
    Close(CloseReason),
}

type WsSink = SplitSink<WebSocket, Message>;

async fn handle_ws_connection<H: EventHandler>(socket: WebSocket, state: Arc<AppState<H>>) {
    let total = state.client_count.fetch_add(1, Ordering::Relaxed) + 1;

    let mut conn = ClientConnection::new(new_id());
    debug!("Session opened: {} (total: {total})", conn.sid);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let mut shutdown_rx = state.shutdown_rx.clone();
    let policy = state.config.on_send_error;

    let open = EnginePacket::Open(OpenPacket {
        sid: conn.sid.clone(),
        upgrades: Vec::new(),
        ping_interval: state.config.ping_interval.as_millis() as u64,
        ping_timeout: state.config.ping_timeout.as_millis() as u64,
        max_payload: state.config.max_payload,
    });
    if let Err(e) = ws_tx.send(Message::Text(open.encode().into())).await {
        error!("Failed to send open packet to {}: {e}", conn.sid);
        state.client_count.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let ping_interval = state.config.ping_interval;
    let mut heartbeat =
        tokio::time::interval_at(tokio::time::Instant::now() + ping_interval, ping_interval);

    let reason = loop {
        // Build the pong timeout future for this iteration
        let pong_deadline = conn.pong_deadline(state.config.ping_timeout);
        let pong_sleep = async move {
            match pong_deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            // Incoming WebSocket message
            msg = ws_rx.next() => {
                let flow = match msg {
                    Some(Ok(Message::Text(text))) => {
                        conn.touch();
                        handle_frame(text.as_str(), &mut conn, &state, &out_tx).await
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!("Dropping {} byte binary frame from {}: binary packets are not supported", data.len(), conn.sid);
                        Flow::Continue
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                        Flow::Continue
                    }
                    Some(Ok(Message::Close(_))) | None => Flow::Close(CloseReason::TransportClose),
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {e}", conn.sid);
                        Flow::Close(CloseReason::TransportError)
                    }
                    _ => Flow::Continue,
                };

                // Deliver whatever the handler queued before reading on
                let flow = match flow {
                    Flow::Continue => flush(&mut ws_tx, &mut out_rx, &conn.sid, policy).await,
                    close => close,
                };
                if let Flow::Close(reason) = flow {
                    break reason;
                }
            }

            // Frames queued outside of a frame handler
            Some(frame) = out_rx.recv() => {
                if let Flow::Close(reason) = write_frame(&mut ws_tx, frame, &conn.sid, policy).await {
                    break reason;
                }
            }

            _ = heartbeat.tick() => {
                if conn.awaiting_pong_since.is_none() {
                    conn.ping_sent();
                    let ping = EnginePacket::Ping(None).encode();
                    if let Flow::Close(reason) = write_frame(&mut ws_tx, ping, &conn.sid, policy).await {
                        break reason;
                    }
                }
            }

            _ = pong_sleep => {
                warn!("Ping timeout for {}", conn.sid);
                break CloseReason::PingTimeout;
            }

            _ = shutdown_rx.changed() => break CloseReason::ServerShutdown,
        }
    };

    if reason == CloseReason::ServerShutdown && conn.is_connected() {
        let goodbye = EnginePacket::message(Packet::disconnect(DEFAULT_NAMESPACE).encode());
        let _ = ws_tx.send(Message::Text(goodbye.encode().into())).await;
    }
    let _ = ws_tx.close().await;

    let total = state.client_count.fetch_sub(1, Ordering::Relaxed) - 1;
    let socket_id = conn.socket.as_ref().map(|s| s.id()).unwrap_or("-");
    debug!(
        "Client disconnected: {} socket {socket_id} ({}, open {:?}, idle {:?}) (total: {total})",
        conn.sid,
        reason.as_str(),
        conn.connected_at.elapsed(),
        conn.idle(),
    );
}

async fn handle_frame<H: EventHandler>(
    text: &str,
    conn: &mut ClientConnection,
    state: &AppState<H>,
    out_tx: &mpsc::UnboundedSender<String>,
) -> Flow {
    if text.len() > state.config.max_payload {
        warn!(
            "Closing {}: {} byte frame exceeds max payload {}",
            conn.sid,
            text.len(),
            state.config.max_payload
        );
        return Flow::Close(CloseReason::PayloadTooLarge);
    }

    let packet = match EnginePacket::decode(text) {
        Ok(p) => p,
        Err(e) => {
            warn!("Dropping malformed frame from {}: {e}", conn.sid);
            return Flow::Continue;
        }
    };

    match packet {
        EnginePacket::Ping(data) => {
            let _ = out_tx.send(EnginePacket::Pong(data).encode());
            Flow::Continue
        }
        EnginePacket::Pong(_) => {
            conn.pong_received();
            Flow::Continue
        }
        EnginePacket::Close => Flow::Close(CloseReason::ClientClose),
        EnginePacket::Message(body) => handle_packet(&body, conn, state, out_tx).await,
        EnginePacket::Noop | EnginePacket::Upgrade => Flow::Continue,
        EnginePacket::Open(_) => {
            warn!("Unexpected open packet from {}", conn.sid);
            Flow::Continue
        }
    }
}

async fn handle_packet<H: EventHandler>(
    body: &str,
    conn: &mut ClientConnection,
    state: &AppState<H>,
    out_tx: &mpsc::UnboundedSender<String>,
) -> Flow {
    let policy = state.config.on_send_error;
    let packet = match Packet::decode(body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Dropping malformed packet from {}: {e}", conn.sid);
            return Flow::Continue;
        }
    };

    match packet.kind {
        PacketType::Connect => {
            if !packet.is_default_namespace() {
                warn!("Rejecting connect to namespace {} from {}", packet.nsp, conn.sid);
                let reply = Packet::connect_error(packet.nsp.as_str(), "Invalid namespace");
                let _ = out_tx.send(EnginePacket::message(reply.encode()).encode());
                return Flow::Continue;
            }
            if conn.is_connected() {
                debug!("Ignoring repeated connect from {}", conn.sid);
                return Flow::Continue;
            }

            let socket = Socket::new(&new_id(), DEFAULT_NAMESPACE, out_tx.clone());
            if let Err(e) = socket.send_packet(&Packet::connect(DEFAULT_NAMESPACE, socket.id())) {
                return send_failed(policy, &conn.sid, e);
            }
            debug!("Socket {} connected on session {}", socket.id(), conn.sid);

            state.handler.on_connect(&socket).await;
            conn.socket = Some(socket);
            Flow::Continue
        }
        PacketType::Event => {
            let socket = match &conn.socket {
                Some(socket) if packet.is_default_namespace() => socket.clone(),
                _ => {
                    warn!(
                        "Dropping event for unconnected namespace {} from {}",
                        packet.nsp, conn.sid
                    );
                    return Flow::Continue;
                }
            };

            let id = packet.id;
            let (name, args) = match packet.into_event() {
                Ok(event) => event,
                Err(e) => {
                    warn!("Dropping malformed event from {}: {e}", conn.sid);
                    return Flow::Continue;
                }
            };
            let ack = id.map(|id| AckHandle::new(id, socket.clone()));

            match state.handler.on_event(&socket, Event::new(name, args, ack)).await {
                Ok(()) => Flow::Continue,
                Err(e) => send_failed(policy, &conn.sid, e),
            }
        }
        PacketType::Disconnect if packet.is_default_namespace() => {
            Flow::Close(CloseReason::NamespaceDisconnect)
        }
        PacketType::Disconnect => Flow::Continue,
        PacketType::Ack => {
            debug!("Ignoring ack {:?} from {}: no acks were requested", packet.id, conn.sid);
            Flow::Continue
        }
        PacketType::ConnectError | PacketType::BinaryEvent | PacketType::BinaryAck => {
            warn!("Unexpected {:?} packet from {}", packet.kind, conn.sid);
            Flow::Continue
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn send_failed(policy: SendErrorPolicy, sid: &str, err: TransportError) -> Flow {
    match policy {
        SendErrorPolicy::Drop => {
            debug!("Dropped reply for {sid}: {err}");
            Flow::Continue
        }
        SendErrorPolicy::Close => {
            error!("Failed to reply to {sid}: {err}");
            Flow::Close(CloseReason::SendFailure)
        }
    }
}

async fn write_frame(ws_tx: &mut WsSink, frame: String, sid: &str, policy: SendErrorPolicy) -> Flow {
    match ws_tx.send(Message::Text(frame.into())).await {
        Ok(()) => Flow::Continue,
        Err(e) => match policy {
            SendErrorPolicy::Drop => {
                debug!("Dropped frame for {sid}: {e}");
                Flow::Continue
            }
            SendErrorPolicy::Close => {
                error!("Failed to send to {sid}: {e}");
                Flow::Close(CloseReason::SendFailure)
            }
        },
    }
}

async fn flush(
    ws_tx: &mut WsSink,
    out_rx: &mut mpsc::UnboundedReceiver<String>,
    sid: &str,
    policy: SendErrorPolicy,
) -> Flow {
    while let Ok(frame) = out_rx.try_recv() {
        if let Flow::Close(reason) = write_frame(ws_tx, frame, sid, policy).await {
            return Flow::Close(reason);
        }
    }
    Flow::Continue
}
