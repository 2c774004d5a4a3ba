//! suggest-server: An HTTP suggestion lookup server
//!
//! Speaks an HTTP/1.1 subset over TCP. Requests whose body is a JSON query
//! object (`{"input": "<id>"}`) are answered with every dataset record
//! matching that id, as `{"suggestions": [{"text", "position"}, ...]}`.
//!
//! Features:
//! - Persistent connections with per-request keep-alive negotiation
//! - One-time dataset load with an id index; no per-query file I/O
//! - Bounded concurrency, read/write deadlines, request size cap
//! - Configuration via CLI arguments or TOML file

mod config;
mod connection;
mod http;
mod server;
mod store;

use config::Config;
use server::Server;
use store::SuggestionStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        dataset = %config.dataset.display(),
        max_connections = config.max_connections,
        "Starting suggest-server"
    );

    // One-time dataset load; serving never re-reads the file. A failed load
    // leaves the store unavailable and queries receive error responses.
    let store = match SuggestionStore::load(&config.dataset) {
        Ok(store) => {
            info!(records = store.len(), "Dataset loaded");
            Some(store)
        }
        Err(e) => {
            warn!(error = %e, "Dataset unavailable, queries will be answered with errors");
            None
        }
    };

    let server = Server::new(config, store);
    server.run(shutdown_signal()).await
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
