//! Request processor: turns a parsed request into a response.
//!
//! A body opening with `{` is treated as a suggestion query and matched
//! against the store; any other body gets an empty suggestion list. All
//! failures are mapped to a Server Error response here, so a bad request
//! never tears down the connection's control flow.

use crate::http::parser::Request;
use crate::http::response::Response;
use crate::store::{Suggestion, SuggestionStore};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Query body schema: `{"input": "<id>"}`.
#[derive(Debug, Deserialize)]
struct Query {
    input: String,
}

/// Success body schema: `{"suggestions": [...]}`.
#[derive(Debug, Serialize)]
struct SuggestionList {
    suggestions: Vec<Suggestion>,
}

/// Per-request processing failures. Each becomes a Server Error response.
#[derive(Debug)]
pub enum ProcessError {
    /// Body looked like a query but failed to parse or violated the schema
    MalformedQuery(serde_json::Error),
    /// No store was loaded at startup
    DatasetUnavailable,
    /// Response serialization failed
    Internal(serde_json::Error),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::MalformedQuery(e) => write!(f, "malformed query: {}", e),
            ProcessError::DatasetUnavailable => write!(f, "suggestion dataset is unavailable"),
            ProcessError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for ProcessError {}

/// Process one request against the store and build the response.
///
/// The match results are a local value threaded through the return path;
/// nothing is accumulated across requests or connections.
pub fn process(request: &Request, store: Option<&SuggestionStore>) -> Response {
    match suggestion_body(request, store) {
        Ok(body) => {
            trace!(method = %request.method, target = %request.target, "Request ok");
            Response::ok(body, request.keep_alive)
        }
        Err(e) => {
            warn!(target = %request.target, error = %e, "Request failed");
            Response::server_error(&e.to_string(), request.keep_alive)
        }
    }
}

fn suggestion_body(
    request: &Request,
    store: Option<&SuggestionStore>,
) -> Result<Vec<u8>, ProcessError> {
    let suggestions = match request.body.first() {
        Some(b'{') => {
            let query: Query = serde_json::from_slice(&request.body)
                .map_err(ProcessError::MalformedQuery)?;
            let store = store.ok_or(ProcessError::DatasetUnavailable)?;
            store.matches(&query.input)
        }
        // Not a query; respond with a deterministic empty list
        _ => Vec::new(),
    };

    to_pretty_json(&SuggestionList { suggestions })
}

/// Serialize pretty-printed with 4-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProcessError> {
    let mut out = Vec::with_capacity(128);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(ProcessError::Internal)?;
    Ok(out)
}
