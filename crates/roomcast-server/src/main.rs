//! Roomcast server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port with five connection slots
//! roomcast-server
//!
//! # Custom port, capacity and broadcast quiet period
//! roomcast-server --port 6666 --max-connections 2 --debounce-ms 500
//! ```

use std::time::Duration;

use clap::Parser;
use roomcast_server::{Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast line protocol server
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Shared window state over a line-oriented TCP protocol")]
#[command(version)]
struct Args {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "5555")]
    port: u16,

    /// Maximum concurrent connections
    #[arg(long, default_value = "5")]
    max_connections: usize,

    /// Quiet period before a state change is broadcast, in milliseconds
    #[arg(long, default_value = "200")]
    debounce_ms: u64,

    /// Longest accepted command line, in bytes
    #[arg(long, default_value = "1024")]
    max_line_length: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig {
        bind_address: format!("{}:{}", args.host, args.port),
        max_connections: args.max_connections,
        debounce: Duration::from_millis(args.debounce_ms),
        max_line_length: args.max_line_length,
        ..Default::default()
    };

    tracing::info!("Roomcast server starting");
    tracing::info!("Binding to {}", config.bind_address);

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Cannot start server: {}", e);
            return Err(e.into());
        },
    };

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                shutdown.cancel();
            },
            Err(e) => tracing::error!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
