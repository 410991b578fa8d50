//! Echo Server — the application side of the Socket.IO demo.
//!
//! Logs every connection on the default namespace and answers each `msg`
//! event with an optional fixed acknowledgement and a `fromServer` echo.

pub mod echo;

pub use echo::{ACK_VALUES, EchoServer};
