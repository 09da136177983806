//! Per-connection request/response cycle.
//!
//! One spawned task drives each accepted socket: read into the fixed buffer,
//! feed the incremental parser, dispatch the completed request, write one
//! chunk-encoded response, then shut the socket down. Shared connection
//! state lives behind `Arc` so handler futures and deferred completions keep
//! it alive without racing teardown; an atomic flag makes close idempotent.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::api;
use crate::error::{ApiError, Result};
use crate::manager::Manager;
use crate::protocol::parser::{Feed, HttpParser, RECV_BUFFER_SIZE};
use crate::protocol::response::{self, ResponseStream};
use crate::protocol::types::RequestHead;

/// Unique identifier for connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Shared state of one accepted socket.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    closing: AtomicBool,
}

impl Connection {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            remote_addr,
            closing: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Flip the closing flag; true for the first caller only, so concurrent
    /// close attempts are idempotent.
    pub fn begin_close(&self) -> bool {
        !self.closing.swap(true, Ordering::AcqRel)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}

/// Drive one accepted socket through a single request/response cycle.
///
/// Returns when the response has been written, the peer disconnected, the
/// idle timeout fired, or the byte stream turned out malformed. Transport
/// faults close the connection without a response.
pub async fn serve(
    manager: Arc<Manager>,
    connection: Arc<Connection>,
    mut stream: TcpStream,
) -> Result<()> {
    let result = drive(&manager, &connection, &mut stream).await;
    connection.begin_close();
    result
}

async fn drive(
    manager: &Arc<Manager>,
    connection: &Arc<Connection>,
    stream: &mut TcpStream,
) -> Result<()> {
    let started = Instant::now();
    let idle_timeout = manager.config().server.idle_timeout;
    let mut parser = HttpParser::with_max_body(manager.config().server.max_body_size);
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut tail = 0usize;

    loop {
        if tail == buf.len() {
            return Err(ApiError::HeadTooLarge { size: buf.len() });
        }

        let read = timeout(idle_timeout, stream.read(&mut buf[tail..])).await;
        let n = match read {
            Ok(Ok(0)) => return Ok(()),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(ApiError::IdleTimeout {
                    timeout: idle_timeout,
                })
            }
        };

        metrics::counter!("http_bytes_received_total").increment(n as u64);

        let len = tail + n;
        match parser.feed(&buf[..len])? {
            Feed::NeedMore { remaining } => {
                // Unconsumed tail moves to the buffer front; the next read
                // lands right after it.
                buf.copy_within(len - remaining..len, 0);
                tail = remaining;
            }
            Feed::Complete => {
                let (head, body) = parser.take().ok_or_else(|| ApiError::Internal {
                    message: "parser reported completion without a request".to_string(),
                })?;

                let reply = handle_request(manager, connection, &head, &body).await;
                let bytes = reply.as_bytes();

                stream.write_all(bytes).await?;
                metrics::counter!("http_bytes_sent_total").increment(bytes.len() as u64);
                metrics::histogram!("http_request_duration_seconds")
                    .record(started.elapsed().as_secs_f64());

                // One request per accepted socket: drain the write and shut
                // the stream down instead of re-arming a read.
                let _ = stream.shutdown().await;
                return Ok(());
            }
        }
    }
}

/// Resolve the route and run its handler, or answer 404.
async fn handle_request(
    manager: &Arc<Manager>,
    connection: &Arc<Connection>,
    head: &RequestHead,
    body: &[u8],
) -> ResponseStream {
    let route = head
        .api_route()
        .and_then(|name| manager.routes().lookup(name, head.method));

    match route {
        Some(route) => {
            tracing::debug!(
                "{} - {} {} routed to {:?}",
                connection.id(),
                head.method,
                head.path,
                route
            );
            metrics::counter!("http_requests_total").increment(1);

            let payload = api::dispatch(manager, route, body).await;
            response::json_reply(&payload)
        }
        None => {
            tracing::debug!(
                "{} - {} {} did not match any route",
                connection.id(),
                head.method,
                head.path
            );
            metrics::counter!("http_requests_unmatched_total").increment(1);

            response::not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
        assert_eq!(format!("{a}"), format!("conn-{}", a.as_u64()));
    }

    #[test]
    fn begin_close_is_idempotent() {
        let connection = Connection::new("127.0.0.1:1".parse().unwrap());
        assert!(!connection.is_closing());
        assert!(connection.begin_close());
        assert!(!connection.begin_close());
        assert!(connection.is_closing());
    }
}
