//! Event name constants.
//!
//! Reserved names are produced by the transport itself; the rest are the
//! application events the echo server understands.

/// All event names, grouped by origin.
pub struct Events;

impl Events {
    // ── Reserved ────────────────────────────────────────────────────────
    pub const CONNECTION: &str = "connection";
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";

    // ── Client → server ─────────────────────────────────────────────────
    pub const MSG: &str = "msg";

    // ── Server → client ─────────────────────────────────────────────────
    pub const FROM_SERVER: &str = "fromServer";
}

/// Whether `name` is reserved and may not be emitted by application code.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, Events::CONNECTION | Events::CONNECT | Events::DISCONNECT)
}
