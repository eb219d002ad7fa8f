//! TCP listener with connection backpressure.
//!
//! # Responsibilities
//! - Bind to a configured authority
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Report the bound address so port 0 can be used in tests

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to an address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept a connection.
    #[error("failed to accept: {0}")]
    Accept(std::io::Error),
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is
/// reached, `accept` waits until a slot becomes available. The permit
/// rides with the connection and is released when the connection task
/// drops it.
pub(crate) struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind `authority` (`host:port`; port 0 picks a free one).
    pub(crate) async fn bind(authority: &str, max_connections: usize) -> Result<Self, ListenerError> {
        let inner = TcpListener::bind(authority)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: authority.to_string(),
                source,
            })?;

        let local_addr = inner.local_addr().map_err(|source| ListenerError::Bind {
            addr: authority.to_string(),
            source,
        })?;

        tracing::info!(
            address = %local_addr,
            max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            local_addr,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Waits if the connection limit has been reached. Returns the stream
    /// and a permit that must be held for the connection's lifetime.
    pub(crate) async fn accept(
        &self,
    ) -> Result<(TcpStream, SocketAddr, OwnedSemaphorePermit), ListenerError> {
        // Acquire the permit first so accept itself applies backpressure.
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, permit))
    }

    /// Get the local address this listener is bound to.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_the_address() {
        let err = ListenerError::Bind {
            addr: "203.0.113.9:80".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        let text = err.to_string();
        assert!(text.contains("203.0.113.9:80"));
        assert!(text.contains("in use"));
    }

    #[tokio::test]
    async fn test_bind_port_zero_reports_real_port() {
        let listener = Listener::bind("127.0.0.1:0", 4).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_accept_hands_out_permits() {
        let listener = Listener::bind("127.0.0.1:0", 2).await.unwrap();
        let addr = listener.local_addr();

        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.connection_limit.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.connection_limit.available_permits(), 2);
        drop(client);
    }
}
