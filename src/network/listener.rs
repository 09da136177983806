use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::manager::Manager;
use crate::network::connection::{self, Connection};

/// TCP listener for the HTTP API.
///
/// Accepts incoming sockets, spawns one connection task per accept, and
/// immediately re-arms itself.
pub struct Listener {
    listener: TcpListener,
    manager: Arc<Manager>,
}

impl Listener {
    pub async fn new(manager: Arc<Manager>) -> Result<Self> {
        let listener = TcpListener::bind(manager.config().server.bind_address).await?;

        tracing::info!(
            "HTTP API listening on {} ({} routes, {} coin backends)",
            listener.local_addr()?,
            manager.routes().len(),
            manager.backends().len()
        );

        Ok(Self { listener, manager })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn accept(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    metrics::counter!("http_connected_total").increment(1);

                    let manager = Arc::clone(&self.manager);
                    let conn = Arc::new(Connection::new(addr));

                    tracing::debug!("{} - accepted connection from {}", conn.id(), addr);

                    tokio::spawn(async move {
                        let id = conn.id();
                        if let Err(e) = connection::serve(manager, conn, stream).await {
                            if e.is_peer_disconnect() {
                                tracing::debug!("{} - closed: {}", id, e);
                            } else {
                                tracing::warn!("{} - error: {}", id, e);
                            }
                        }

                        metrics::counter!("http_disconnected_total").increment(1);
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
