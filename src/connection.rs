//! Connection handler: the per-connection read/process/write loop.
//!
//! Each connection runs a state machine:
//!
//! ```text
//! Reading -> Processing -> Writing -> Reading   (keep-alive)
//!                                  -> Closed    (close requested)
//! ```
//!
//! Reads accumulate into a buffer persisted across the loop, so pipelined
//! and partially-delivered requests parse correctly. Reads and writes carry
//! deadlines, and a request that outgrows the configured size cap is
//! rejected, so a slow or hostile peer cannot pin the task forever.

use crate::http::handler;
use crate::http::parser::{self, ParseResult, Request};
use crate::http::response::Response;
use crate::server::ServerState;
use bytes::{Buf, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{trace, warn};

/// Initial read buffer capacity
const BUFFER_SIZE: usize = 16 * 1024;

/// Connection state. `Processing` and `Writing` carry the value the next
/// phase consumes, so per-request data lives on the state machine and
/// nowhere else.
#[derive(Debug)]
enum ConnState {
    /// Accumulating bytes until a full request parses
    Reading,
    /// A request is ready for the processor
    Processing(Request),
    /// A response is ready to go out
    Writing(Response),
    /// The connection is done; shut down the write side
    Closed,
}

/// Transport-level connection failures. These close the connection and are
/// reported by the accepting task; they never affect other connections.
#[derive(Debug)]
pub enum ConnError {
    ReadTimeout,
    WriteTimeout,
    Read(std::io::Error),
    Write(std::io::Error),
}

impl std::fmt::Display for ConnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnError::ReadTimeout => write!(f, "read timed out"),
            ConnError::WriteTimeout => write!(f, "write timed out"),
            ConnError::Read(e) => write!(f, "read failed: {}", e),
            ConnError::Write(e) => write!(f, "write failed: {}", e),
        }
    }
}

impl std::error::Error for ConnError {}

/// Drive one connection until it closes.
///
/// Generic over the stream so tests can run it over in-memory duplex pipes.
pub async fn handle_connection<S>(mut stream: S, state: Arc<ServerState>) -> Result<(), ConnError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
    let mut conn = ConnState::Reading;

    loop {
        conn = match conn {
            ConnState::Reading => read_request(&mut stream, &mut buffer, &state).await?,

            ConnState::Processing(request) => {
                let response = handler::process(&request, state.store.as_ref());
                ConnState::Writing(response)
            }

            ConnState::Writing(response) => {
                let bytes = response.encode();
                let deadline = Duration::from_secs(state.config.write_timeout);
                match timeout(deadline, stream.write_all(&bytes)).await {
                    Err(_) => return Err(ConnError::WriteTimeout),
                    Ok(Err(e)) => return Err(ConnError::Write(e)),
                    Ok(Ok(())) => {}
                }
                trace!(
                    status = response.status.code(),
                    bytes = bytes.len(),
                    "Response written"
                );

                if response.keep_alive {
                    ConnState::Reading
                } else {
                    ConnState::Closed
                }
            }

            ConnState::Closed => break,
        };
    }

    // Orderly shutdown of the write side; the peer sees a clean EOF
    let _ = stream.shutdown().await;
    Ok(())
}

/// Reading phase: parse a request out of the buffer, pulling more bytes
/// from the stream as needed.
async fn read_request<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
    state: &ServerState,
) -> Result<ConnState, ConnError>
where
    S: AsyncRead + Unpin,
{
    loop {
        match parser::parse(buffer) {
            ParseResult::Complete(request, consumed) => {
                buffer.advance(consumed);
                trace!(method = %request.method, target = %request.target, "Request parsed");
                return Ok(ConnState::Processing(request));
            }

            ParseResult::Incomplete => {
                if buffer.len() >= state.config.max_request_size {
                    warn!(bytes = buffer.len(), "Request exceeds maximum size");
                    return Ok(ConnState::Writing(Response::server_error(
                        "request exceeds maximum size",
                        false,
                    )));
                }

                let deadline = Duration::from_secs(state.config.read_timeout);
                let n = match timeout(deadline, stream.read_buf(buffer)).await {
                    Err(_) => return Err(ConnError::ReadTimeout),
                    Ok(Err(e)) => return Err(ConnError::Read(e)),
                    Ok(Ok(n)) => n,
                };

                if n == 0 {
                    // Clean end-of-stream; mid-request data is abandoned
                    if !buffer.is_empty() {
                        trace!(pending = buffer.len(), "Connection closed mid-request");
                    }
                    return Ok(ConnState::Closed);
                }
            }

            ParseResult::Error(e) => {
                // The stream can no longer be framed; answer and close
                warn!(error = %e, "Request parse error");
                return Ok(ConnState::Writing(Response::server_error(
                    &e.to_string(),
                    false,
                )));
            }
        }
    }
}
