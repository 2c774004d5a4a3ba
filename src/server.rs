//! TCP server for handling suggestion connections.
//!
//! Binds the configured address, caps concurrency with a semaphore, and
//! runs each accepted connection on its own task. On shutdown the accept
//! loop stops and in-flight connections are drained before returning.

use crate::config::Config;
use crate::connection;
use crate::store::SuggestionStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Read-only state shared with every connection task.
pub struct ServerState {
    pub config: Config,
    /// `None` when the dataset failed to load at startup; queries are then
    /// answered with error responses instead of crashing the process.
    pub store: Option<SuggestionStore>,
}

/// Server instance
pub struct Server {
    state: Arc<ServerState>,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config, store: Option<SuggestionStore>) -> Self {
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));

        Server {
            state: Arc::new(ServerState { config, store }),
            connection_limit,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run(
        &self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&self.state.config.listen).await?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections from `listener` until `shutdown` resolves, then
    /// drain in-flight connections.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        info!(address = %listener.local_addr()?, "Server listening");
        tokio::pin!(shutdown);

        loop {
            // Admission control: wait for a connection slot before accepting
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = self.connection_limit.clone().acquire_owned() => permit?,
            };

            let (stream, addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %addr, "New connection");
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                if let Err(e) = connection::handle_connection(stream, state).await {
                    debug!(error = %e, "Connection error");
                }
                drop(permit);
            });
        }

        // All permits back means every connection task has finished. Idle
        // keep-alive peers fall out via the read deadline.
        info!("Shutdown requested, draining connections");
        let _ = self
            .connection_limit
            .acquire_many(self.state.config.max_connections as u32)
            .await?;
        info!("Server stopped");
        Ok(())
    }

    /// Get a reference to the shared state for testing
    #[cfg(test)]
    pub(crate) fn state(&self) -> &Arc<ServerState> {
        &self.state
    }
}
