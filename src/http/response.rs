//! HTTP response builder.
//!
//! Three response kinds: Ok (JSON suggestions), Not Found, Server Error.
//! Every response carries `Server`, `Content-Type`, `Content-Length` and
//! `Connection` headers; `Connection` reflects the originating request's
//! keep-alive preference.

use bytes::BytesMut;

/// Value of the `Server` header.
pub const SERVER_NAME: &str = concat!("suggest-server/", env!("CARGO_PKG_VERSION"));

/// Response status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

/// A response ready to be encoded onto the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub keep_alive: bool,
}

impl Response {
    /// Successful suggestion response with a JSON body.
    pub fn ok(body: Vec<u8>, keep_alive: bool) -> Response {
        Response {
            status: Status::Ok,
            content_type: "application/json",
            body,
            keep_alive,
        }
    }

    /// The requested resource does not exist.
    pub fn not_found(target: &str, keep_alive: bool) -> Response {
        Response {
            status: Status::NotFound,
            content_type: "text/html",
            body: format!("The resource '{}' was not found.", target).into_bytes(),
            keep_alive,
        }
    }

    /// A request failed; `what` describes the failure to the client.
    pub fn server_error(what: &str, keep_alive: bool) -> Response {
        Response {
            status: Status::InternalServerError,
            content_type: "text/html",
            body: format!("An error occurred: '{}'", what).into_bytes(),
            keep_alive,
        }
    }

    /// Encode the full wire image: status line, headers, blank line, body.
    pub fn encode(&self) -> BytesMut {
        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        let head = format!(
            "HTTP/1.1 {} {}\r\nServer: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            SERVER_NAME,
            self.content_type,
            self.body.len(),
            connection,
        );

        let mut buf = BytesMut::with_capacity(head.len() + self.body.len());
        buf.extend_from_slice(head.as_bytes());
        buf.extend_from_slice(&self.body);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(response: &Response) -> String {
        String::from_utf8(response.encode().to_vec()).unwrap()
    }

    #[test]
    fn test_encode_ok() {
        let response = Response::ok(b"{}".to_vec(), true);
        let wire = wire(&response);

        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains(&format!("Server: {}\r\n", SERVER_NAME)));
        assert!(wire.contains("Content-Type: application/json\r\n"));
        assert!(wire.contains("Content-Length: 2\r\n"));
        assert!(wire.contains("Connection: keep-alive\r\n"));
        assert!(wire.ends_with("\r\n\r\n{}"));
    }

    #[test]
    fn test_encode_not_found() {
        let response = Response::not_found("/missing", false);
        let wire = wire(&response);

        assert!(wire.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(wire.contains("Content-Type: text/html\r\n"));
        assert!(wire.contains("Connection: close\r\n"));
        assert!(wire.ends_with("The resource '/missing' was not found."));
    }

    #[test]
    fn test_encode_server_error() {
        let response = Response::server_error("boom", true);
        let wire = wire(&response);

        assert!(wire.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(wire.ends_with("An error occurred: 'boom'"));
    }

    #[test]
    fn test_content_length_matches_body() {
        let body = b"0123456789".to_vec();
        let response = Response::ok(body.clone(), true);
        let wire = wire(&response);

        assert!(wire.contains(&format!("Content-Length: {}\r\n", body.len())));
    }

    #[test]
    fn test_connection_header_reflects_preference() {
        assert!(wire(&Response::ok(Vec::new(), true)).contains("Connection: keep-alive\r\n"));
        assert!(wire(&Response::ok(Vec::new(), false)).contains("Connection: close\r\n"));
    }
}
