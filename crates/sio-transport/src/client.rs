//! Per-session connection state.

use std::time::{Duration, Instant};

use crate::socket::Socket;

/// State of one Engine.IO session and the socket it hosts.
#[derive(Debug)]
pub struct ClientConnection {
    /// Engine.IO session id (sent in the open packet)
    pub sid: String,
    /// When the WebSocket was accepted
    pub connected_at: Instant,
    /// Socket on the default namespace, set once the client connects to it
    pub socket: Option<Socket>,
    /// When the oldest unanswered ping was sent
    pub awaiting_pong_since: Option<Instant>,
    /// Last time we received any frame from this client
    pub last_activity: Instant,
}

impl ClientConnection {
    pub fn new(sid: String) -> Self {
        let now = Instant::now();
        Self {
            sid,
            connected_at: now,
            socket: None,
            awaiting_pong_since: None,
            last_activity: now,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the client last sent a frame.
    pub fn idle(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn ping_sent(&mut self) {
        if self.awaiting_pong_since.is_none() {
            self.awaiting_pong_since = Some(Instant::now());
        }
    }

    pub fn pong_received(&mut self) {
        self.awaiting_pong_since = None;
    }

    /// Deadline for the outstanding ping, if any.
    pub fn pong_deadline(&self, ping_timeout: Duration) -> Option<Instant> {
        self.awaiting_pong_since.map(|sent| sent + ping_timeout)
    }
}
