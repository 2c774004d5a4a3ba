//! HTTP/1.x request parser.
//!
//! Parses the subset of HTTP the server speaks: a request line, headers
//! terminated by an empty line, and an optional `Content-Length` body.
//! Parsing is incremental over a caller-owned buffer; a short buffer yields
//! `Incomplete` and the caller reads more before retrying.

/// HTTP protocol version on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Whether the connection should stay open after the response,
    /// negotiated from the `Connection` header and the version default.
    pub keep_alive: bool,
}

impl Request {
    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Request parsing errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Request line is not `METHOD SP TARGET SP VERSION`
    BadRequestLine(String),
    /// Version is not HTTP/1.0 or HTTP/1.1
    UnsupportedVersion(String),
    /// Header line has no colon separator
    BadHeader(String),
    /// Content-Length is present but not a valid length
    BadContentLength(String),
    /// Request head is not valid UTF-8
    InvalidEncoding,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::BadRequestLine(line) => write!(f, "Bad request line: {}", line),
            ParseError::UnsupportedVersion(v) => write!(f, "Unsupported version: {}", v),
            ParseError::BadHeader(line) => write!(f, "Bad header: {}", line),
            ParseError::BadContentLength(v) => write!(f, "Bad content length: {}", v),
            ParseError::InvalidEncoding => write!(f, "Request head is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Result of a parse attempt.
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed a request, with total bytes consumed
    Complete(Request, usize),
    /// Need more data
    Incomplete,
    /// Parse error
    Error(ParseError),
}

/// Try to parse one request from the front of `buffer`.
///
/// On `Complete(request, consumed)` the caller advances the buffer by
/// `consumed`; any remaining bytes belong to the next pipelined request.
pub fn parse(buffer: &[u8]) -> ParseResult {
    // Head ends at the first blank line
    let head_end = match find_head_end(buffer) {
        Some(pos) => pos,
        None => return ParseResult::Incomplete,
    };

    let head = match std::str::from_utf8(&buffer[..head_end]) {
        Ok(head) => head,
        Err(_) => return ParseResult::Error(ParseError::InvalidEncoding),
    };

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");

    let (method, target, version) = match parse_request_line(request_line) {
        Ok(parts) => parts,
        Err(e) => return ParseResult::Error(e),
    };

    let mut headers = Vec::new();
    for line in lines {
        match line.split_once(':') {
            Some((name, value)) => {
                headers.push((name.trim().to_string(), value.trim().to_string()))
            }
            None => return ParseResult::Error(ParseError::BadHeader(line.to_string())),
        }
    }

    let content_length = match header_value(&headers, "Content-Length") {
        Some(value) => match value.parse::<usize>() {
            Ok(len) => len,
            Err(_) => return ParseResult::Error(ParseError::BadContentLength(value.to_string())),
        },
        None => 0,
    };

    let body_start = head_end + 4;
    let total = body_start + content_length;
    if buffer.len() < total {
        return ParseResult::Incomplete;
    }

    let keep_alive = match header_value(&headers, "Connection") {
        Some(value) if value.eq_ignore_ascii_case("close") => false,
        Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
        _ => version == Version::Http11,
    };

    let request = Request {
        method,
        target,
        version,
        headers,
        body: buffer[body_start..total].to_vec(),
        keep_alive,
    };

    ParseResult::Complete(request, total)
}

/// Find the `\r\n\r\n` head terminator, returning the offset of its start.
fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request_line(line: &str) -> Result<(String, String, Version), ParseError> {
    let mut parts = line.split_ascii_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version), None) => (method, target, version),
        _ => return Err(ParseError::BadRequestLine(line.to_string())),
    };

    let version = match version {
        "HTTP/1.1" => Version::Http11,
        "HTTP/1.0" => Version::Http10,
        other => return Err(ParseError::UnsupportedVersion(other.to_string())),
    };

    Ok((method.to_string(), target.to_string(), version))
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_without_body() {
        let buffer = b"GET /v1/api/suggest HTTP/1.1\r\nHost: localhost\r\n\r\n";
        match parse(buffer) {
            ParseResult::Complete(req, consumed) => {
                assert_eq!(req.method, "GET");
                assert_eq!(req.target, "/v1/api/suggest");
                assert_eq!(req.version, Version::Http11);
                assert!(req.body.is_empty());
                assert!(req.keep_alive);
                assert_eq!(consumed, buffer.len());
            }
            other => panic!("Expected complete request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_post_with_body() {
        let buffer =
            b"POST / HTTP/1.1\r\nContent-Length: 17\r\n\r\n{\"input\": \"abc\"}\n";
        match parse(buffer) {
            ParseResult::Complete(req, consumed) => {
                assert_eq!(req.method, "POST");
                assert_eq!(req.body, b"{\"input\": \"abc\"}\n");
                assert_eq!(consumed, buffer.len());
            }
            other => panic!("Expected complete request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_pipelined_requests() {
        let first = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi";
        let mut buffer = first.to_vec();
        buffer.extend_from_slice(b"GET /next HTTP/1.1\r\n\r\n");

        match parse(&buffer) {
            ParseResult::Complete(req, consumed) => {
                assert_eq!(req.body, b"hi");
                assert_eq!(consumed, first.len());

                match parse(&buffer[consumed..]) {
                    ParseResult::Complete(next, _) => assert_eq!(next.target, "/next"),
                    other => panic!("Expected second request, got {:?}", other),
                }
            }
            other => panic!("Expected complete request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_incomplete_head() {
        assert!(matches!(
            parse(b"POST / HTTP/1.1\r\nContent-Len"),
            ParseResult::Incomplete
        ));
    }

    #[test]
    fn test_parse_incomplete_body() {
        let buffer = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert!(matches!(parse(buffer), ParseResult::Incomplete));
    }

    #[test]
    fn test_parse_empty_buffer() {
        assert!(matches!(parse(b""), ParseResult::Incomplete));
    }

    #[test]
    fn test_bad_request_line() {
        let buffer = b"NONSENSE\r\n\r\n";
        assert!(matches!(
            parse(buffer),
            ParseResult::Error(ParseError::BadRequestLine(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let buffer = b"GET / HTTP/2.0\r\n\r\n";
        assert!(matches!(
            parse(buffer),
            ParseResult::Error(ParseError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_bad_content_length() {
        let buffer = b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n";
        assert!(matches!(
            parse(buffer),
            ParseResult::Error(ParseError::BadContentLength(_))
        ));
    }

    #[test]
    fn test_bad_header_line() {
        let buffer = b"GET / HTTP/1.1\r\nno-colon-here\r\n\r\n";
        assert!(matches!(
            parse(buffer),
            ParseResult::Error(ParseError::BadHeader(_))
        ));
    }

    #[test]
    fn test_keep_alive_negotiation() {
        let cases: [(&[u8], bool); 4] = [
            (b"GET / HTTP/1.1\r\n\r\n", true),
            (b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n", false),
            (b"GET / HTTP/1.0\r\n\r\n", false),
            (b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n", true),
        ];

        for (buffer, expected) in cases {
            match parse(buffer) {
                ParseResult::Complete(req, _) => assert_eq!(
                    req.keep_alive, expected,
                    "wrong keep-alive for {:?}",
                    std::str::from_utf8(buffer).unwrap()
                ),
                other => panic!("Expected complete request, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let buffer = b"POST / HTTP/1.1\r\ncontent-length: 2\r\n\r\nok";
        match parse(buffer) {
            ParseResult::Complete(req, _) => {
                assert_eq!(req.header("Content-Length"), Some("2"));
                assert_eq!(req.body, b"ok");
            }
            other => panic!("Expected complete request, got {:?}", other),
        }
    }
}
