use crate::error::{ApiError, Result};
use crate::protocol::types::{Method, RequestHead};

/// Size of the fixed per-connection receive buffer. The request head must fit
/// in it; the body is accumulated separately up to the configured cap.
pub const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Default cap on the accumulated request body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Outcome of one [`HttpParser::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// A full request is buffered; take it with [`HttpParser::take`].
    Complete,
    /// `remaining` trailing bytes were left unconsumed. The caller copies
    /// exactly that many to the front of its receive buffer and appends the
    /// next read after them before feeding again.
    NeedMore { remaining: usize },
}

#[derive(Debug)]
enum State {
    Head,
    Body { expected: usize },
    Done,
}

/// Incremental HTTP/1.1 request parser.
///
/// Restartable across partial reads: feeding one logical byte stream in a
/// single call or in arbitrarily many fragments produces identical results.
#[derive(Debug)]
pub struct HttpParser {
    state: State,
    head: Option<RequestHead>,
    body: Vec<u8>,
    max_body: usize,
}

impl HttpParser {
    pub fn new() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY_SIZE)
    }

    pub fn with_max_body(max_body: usize) -> Self {
        Self {
            state: State::Head,
            head: None,
            body: Vec::new(),
            max_body,
        }
    }

    /// Discard any partial state and await a fresh request.
    pub fn reset(&mut self) {
        self.state = State::Head;
        self.head = None;
        self.body.clear();
    }

    /// Feed the buffered byte stream and advance the state machine.
    ///
    /// `data` must contain the unconsumed tail reported by the previous call
    /// followed by the newly read bytes.
    pub fn feed(&mut self, data: &[u8]) -> Result<Feed> {
        match self.state {
            State::Head => {
                let Some(head_end) = find_head_end(data) else {
                    return Ok(Feed::NeedMore {
                        remaining: data.len(),
                    });
                };

                let head = parse_head(&data[..head_end])?;
                if head.content_length > self.max_body {
                    return Err(ApiError::BodyTooLarge {
                        size: head.content_length,
                        max: self.max_body,
                    });
                }

                let body_start = head_end + 4;
                let available = data.len() - body_start;
                let take = available.min(head.content_length);

                self.body.clear();
                self.body.reserve(head.content_length);
                self.body.extend_from_slice(&data[body_start..body_start + take]);

                let missing = head.content_length - take;
                self.head = Some(head);

                if missing == 0 {
                    // One request per connection; trailing pipelined bytes
                    // are dropped.
                    self.state = State::Done;
                    Ok(Feed::Complete)
                } else {
                    self.state = State::Body { expected: missing };
                    Ok(Feed::NeedMore { remaining: 0 })
                }
            }
            State::Body { expected } => {
                let take = data.len().min(expected);
                self.body.extend_from_slice(&data[..take]);

                let missing = expected - take;
                if missing == 0 {
                    self.state = State::Done;
                    Ok(Feed::Complete)
                } else {
                    self.state = State::Body { expected: missing };
                    Ok(Feed::NeedMore { remaining: 0 })
                }
            }
            State::Done => Ok(Feed::Complete),
        }
    }

    /// Take the completed request, resetting the parser.
    pub fn take(&mut self) -> Option<(RequestHead, Vec<u8>)> {
        if !matches!(self.state, State::Done) {
            return None;
        }

        let head = self.head.take()?;
        let body = std::mem::take(&mut self.body);
        self.state = State::Head;
        Some((head, body))
    }
}

impl Default for HttpParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(head: &[u8]) -> Result<RequestHead> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(head.len());

    let (method, path) = parse_request_line(&head[..line_end])?;
    let content_length = parse_content_length(&head[line_end..])?;

    Ok(RequestHead {
        method,
        path,
        content_length,
    })
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String)> {
    let line = std::str::from_utf8(line).map_err(|_| malformed("request line is not UTF-8"))?;
    let mut parts = line.split(' ').filter(|s| !s.is_empty());

    let method = parts
        .next()
        .and_then(|token| Method::from_bytes(token.as_bytes()))
        .ok_or_else(|| malformed("unrecognized method"))?;

    let path = parts.next().ok_or_else(|| malformed("missing request target"))?;

    let version = parts.next().ok_or_else(|| malformed("missing HTTP version"))?;
    if !version.starts_with("HTTP/") {
        return Err(malformed("bad HTTP version"));
    }

    Ok((method, path.to_string()))
}

/// Content-Length is the only header the frontend reads; everything else is
/// skipped without validation.
fn parse_content_length(headers: &[u8]) -> Result<usize> {
    let headers = std::str::from_utf8(headers).map_err(|_| malformed("headers are not UTF-8"))?;

    for line in headers.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        if name.trim().eq_ignore_ascii_case("content-length") {
            return value
                .trim()
                .parse::<usize>()
                .map_err(|_| malformed("bad Content-Length"));
        }
    }

    Ok(0)
}

fn malformed(message: &str) -> ApiError {
    ApiError::Parse {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] =
        b"POST /api/userLogin HTTP/1.1\r\nHost: pool\r\nContent-Length: 35\r\n\r\n{\"login\":\"alice\",\"password\":\"pass\"}";

    /// Drive the parser the way a connection does: a fixed buffer whose
    /// unconsumed tail is copied to the front before the next read.
    fn drive(stream: &[u8], chunk: usize) -> (RequestHead, Vec<u8>) {
        let mut parser = HttpParser::new();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut tail = 0usize;

        for piece in stream.chunks(chunk) {
            buf[tail..tail + piece.len()].copy_from_slice(piece);
            let len = tail + piece.len();

            match parser.feed(&buf[..len]).expect("parse") {
                Feed::Complete => return parser.take().expect("complete request"),
                Feed::NeedMore { remaining } => {
                    buf.copy_within(len - remaining..len, 0);
                    tail = remaining;
                }
            }
        }

        panic!("stream ended before the request completed");
    }

    #[test]
    fn single_feed_parses_request() {
        let (head, body) = drive(REQUEST, REQUEST.len());
        assert_eq!(head.method, Method::Post);
        assert_eq!(head.path, "/api/userLogin");
        assert_eq!(head.api_route(), Some("userLogin"));
        assert_eq!(body, &REQUEST[REQUEST.len() - 35..]);
    }

    #[test]
    fn fragmentation_invariance() {
        let (reference_head, reference_body) = drive(REQUEST, REQUEST.len());

        for chunk in 1..REQUEST.len() {
            let (head, body) = drive(REQUEST, chunk);
            assert_eq!(head.method, reference_head.method, "chunk size {chunk}");
            assert_eq!(head.path, reference_head.path, "chunk size {chunk}");
            assert_eq!(body, reference_body, "chunk size {chunk}");
        }
    }

    #[test]
    fn request_without_body() {
        let request = b"GET /api/instanceEnumerateAll HTTP/1.1\r\nHost: pool\r\n\r\n";
        let (head, body) = drive(request, request.len());
        assert_eq!(head.method, Method::Get);
        assert_eq!(head.content_length, 0);
        assert!(body.is_empty());
    }

    #[test]
    fn body_split_across_reads_consumes_everything() {
        let mut parser = HttpParser::new();
        let head_end = REQUEST.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let split = head_end + 10;

        assert_eq!(
            parser.feed(&REQUEST[..split]).unwrap(),
            Feed::NeedMore { remaining: 0 }
        );
        assert_eq!(parser.feed(&REQUEST[split..]).unwrap(), Feed::Complete);

        let (_, body) = parser.take().unwrap();
        assert_eq!(body, &REQUEST[head_end..]);
    }

    #[test]
    fn unrecognized_method_is_an_error() {
        let mut parser = HttpParser::new();
        let result = parser.feed(b"BREW /api/userLogin HTTP/1.1\r\n\r\n");
        assert!(matches!(result, Err(ApiError::Parse { .. })));
    }

    #[test]
    fn bad_content_length_is_an_error() {
        let mut parser = HttpParser::new();
        let result = parser.feed(b"POST /api/userLogin HTTP/1.1\r\nContent-Length: many\r\n\r\n");
        assert!(matches!(result, Err(ApiError::Parse { .. })));
    }

    #[test]
    fn missing_version_is_an_error() {
        let mut parser = HttpParser::new();
        let result = parser.feed(b"POST /api/userLogin\r\n\r\n");
        assert!(matches!(result, Err(ApiError::Parse { .. })));
    }

    #[test]
    fn oversized_body_is_rejected() {
        let mut parser = HttpParser::with_max_body(16);
        let result = parser.feed(b"POST /api/userLogin HTTP/1.1\r\nContent-Length: 17\r\n\r\n");
        assert!(matches!(result, Err(ApiError::BodyTooLarge { .. })));
    }

    #[test]
    fn take_before_completion_returns_none() {
        let mut parser = HttpParser::new();
        parser.feed(b"POST /api/u").unwrap();
        assert!(parser.take().is_none());
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut parser = HttpParser::new();
        parser.feed(&REQUEST[..REQUEST.len() - 5]).unwrap();
        parser.reset();
        assert_eq!(parser.feed(REQUEST).unwrap(), Feed::Complete);
    }
}
