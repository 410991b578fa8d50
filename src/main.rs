//! sio-echo — Socket.IO echo server
//!
//! Accepts Socket.IO (Engine.IO v4, WebSocket transport) clients, logs each
//! connection, and answers every `msg` event with a `fromServer` echo of
//! its payload as text, acknowledging with `1, 2, 3` when asked.
//!
//! Usage:
//!   sio-echo                          # Listen on *:3000
//!   sio-echo --port 8080              # Custom port
//!   sio-echo --on-send-error close    # Close sessions whose replies fail
//!   sio-echo --log-file               # Log to ~/.sio-echo/echo.log

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sio_server::EchoServer;
use sio_transport::{SendErrorPolicy, TransportConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sio-echo", about = "Socket.IO echo server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "0.0.0.0")]
    hostname: String,

    /// Mount path of the Socket.IO endpoint
    #[arg(long, default_value = "/socket.io")]
    path: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "1024")]
    max_connections: usize,

    /// Milliseconds between server pings
    #[arg(long, default_value = "25000", value_parser = clap::value_parser!(u64).range(1..))]
    ping_interval_ms: u64,

    /// Milliseconds a client has to answer a ping
    #[arg(long, default_value = "20000", value_parser = clap::value_parser!(u64).range(1..))]
    ping_timeout_ms: u64,

    /// Largest accepted frame, in bytes
    #[arg(long, default_value = "1000000")]
    max_payload: usize,

    /// Allow cross-origin requests
    #[arg(long)]
    cors: bool,

    /// What to do when a reply cannot be delivered: drop or close
    #[arg(long, default_value = "drop")]
    on_send_error: SendErrorPolicy,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write logs to a file (defaults to ~/.sio-echo/echo.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    let json = cli.log_format == LogFormat::Json;

    if let Some(ref log_file_arg) = cli.log_file {
        // Resolve log file path
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        let log_path = if log_file_arg == "DEFAULT" {
            PathBuf::from(&home).join(".sio-echo/echo.log")
        } else {
            PathBuf::from(log_file_arg)
        };

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .unwrap_or_else(|e| panic!("Failed to open log file {}: {e}", log_path.display()));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }

        eprintln!("Logging to {}", log_path.display());
    } else {
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        path: cli.path.clone(),
        ping_interval: Duration::from_millis(cli.ping_interval_ms),
        ping_timeout: Duration::from_millis(cli.ping_timeout_ms),
        max_payload: cli.max_payload,
        max_connections: Some(cli.max_connections),
        enable_cors: cli.cors,
        on_send_error: cli.on_send_error,
    };

    let mut server = match EchoServer::new().listen(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    let _ = tokio::signal::ctrl_c().await;
    server.stop().await;
}
