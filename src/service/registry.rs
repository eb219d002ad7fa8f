//! Service registry and server assembly.
//!
//! # Responsibilities
//! - Map `http://host:port/path` addresses to request handlers
//! - Share one listener between services on the same authority
//! - Spawn accept loops wired to the shared dispatch pool
//! - Coordinate graceful shutdown via a broadcast channel

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::address::{Address, AddressError, Scheme};
use crate::config::schema::EngineConfig;
use crate::net::connection::{self, ConnectionContext, ConnectionId, ServiceMap};
use crate::net::listener::{Listener, ListenerError};
use crate::service::workers::DispatchPool;
use crate::service::Handler;

/// Error type for service registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The service address does not parse.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// Services listen on plain `http` addresses only.
    #[error("cannot listen on {0} address")]
    UnsupportedScheme(Scheme),
    /// The path is already registered on this authority.
    #[error("duplicate service path {path} on {authority}")]
    DuplicatePath { authority: String, path: String },
}

/// Error type for starting the engine.
#[derive(Debug, Error)]
pub enum ServeError {
    /// No services have been registered.
    #[error("no services registered")]
    Empty,
    /// A listener failed to bind.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Registry of request handlers keyed by service address.
///
/// Registration order decides listener start order, so `local_addr()` on
/// the running handle refers to the first authority registered.
#[derive(Default)]
pub struct Services {
    bindings: Vec<(String, ServiceMap)>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` at `address` (`http://host:port/path`).
    ///
    /// Services sharing an authority share one listener. Registering the
    /// same path twice on one authority is an error and leaves the
    /// registry unchanged.
    pub fn add(&mut self, address: &str, handler: impl Handler) -> Result<(), RegistryError> {
        let addr = Address::parse(address)?;
        if addr.scheme != Scheme::Http {
            return Err(RegistryError::UnsupportedScheme(addr.scheme));
        }

        let authority = addr.authority();
        // Routing matches on the path alone; a query in the registration
        // address is dropped.
        let path = match addr.path.split_once('?') {
            Some((path, _)) => path.to_string(),
            None => addr.path,
        };

        let idx = match self.bindings.iter().position(|(a, _)| a == &authority) {
            Some(idx) => idx,
            None => {
                self.bindings.push((authority.clone(), HashMap::new()));
                self.bindings.len() - 1
            }
        };

        let services = &mut self.bindings[idx].1;
        if services.contains_key(&path) {
            return Err(RegistryError::DuplicatePath { authority, path });
        }
        services.insert(path, Arc::new(handler));
        Ok(())
    }

    /// Bind every registered authority and start serving.
    ///
    /// Returns a handle exposing the bound addresses (friendly to port 0)
    /// and graceful shutdown.
    pub async fn serve(self, config: &EngineConfig) -> Result<ServerHandle, ServeError> {
        if self.bindings.is_empty() {
            return Err(ServeError::Empty);
        }

        let pool = DispatchPool::new(config.workers.pool_size);
        let io_timeout = Duration::from_secs(config.timeouts.io_secs);
        let (shutdown_tx, _) = broadcast::channel(1);

        let mut addrs = Vec::with_capacity(self.bindings.len());
        let mut tasks = Vec::with_capacity(self.bindings.len());

        for (authority, services) in self.bindings {
            let listener = Listener::bind(&authority, config.listener.max_connections).await?;
            addrs.push(listener.local_addr());

            let ctx = ConnectionContext {
                services: Arc::new(services),
                pool: pool.clone(),
                io_timeout,
            };
            tasks.push(tokio::spawn(accept_loop(
                listener,
                ctx,
                shutdown_tx.subscribe(),
            )));
        }

        tracing::info!(
            listeners = addrs.len(),
            workers = pool.size(),
            "Transport engine serving"
        );

        Ok(ServerHandle {
            addrs,
            shutdown: shutdown_tx,
            tasks,
        })
    }
}

/// Accept connections until shutdown fires.
///
/// Established connections are not interrupted; each drains its pending
/// responses and closes on its own.
async fn accept_loop(
    listener: Listener,
    ctx: ConnectionContext,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    let id = ConnectionId::next();
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        connection::drive(id, peer, stream, ctx).await;
                    });
                }
                Err(err) => {
                    // Transient accept failures (EMFILE and friends) back
                    // off with jitter instead of spinning.
                    tracing::warn!(error = %err, "Accept failed; backing off");
                    tokio::time::sleep(Duration::from_millis(10 + fastrand::u64(..20))).await;
                }
            },
        }
    }

    tracing::info!(address = %listener.local_addr(), "Listener stopped");
}

/// Handle to a running engine.
///
/// Dropping the handle closes the shutdown channel, which also stops the
/// accept loops; [`ServerHandle::shutdown`] does the same explicitly and
/// waits for them to finish.
#[derive(Debug)]
pub struct ServerHandle {
    addrs: Vec<SocketAddr>,
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Bound address of the first registered authority.
    pub fn local_addr(&self) -> SocketAddr {
        self.addrs[0]
    }

    /// All bound addresses, in registration order.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Stop accepting new connections and wait for the accept loops to
    /// exit. Connections already established finish their pending writes.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("Transport engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServerRequest;

    fn reply_ok(request: ServerRequest) -> impl std::future::Future<Output = ()> + Send {
        async move { request.send_reply("ok", &[]) }
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut services = Services::new();
        services.add("http://127.0.0.1:3380/echo", reply_ok).unwrap();
        let err = services
            .add("http://127.0.0.1:3380/echo", reply_ok)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePath { .. }));
    }

    #[test]
    fn test_same_path_on_distinct_authorities_allowed() {
        let mut services = Services::new();
        services.add("http://127.0.0.1:3380/echo", reply_ok).unwrap();
        services.add("http://127.0.0.1:3381/echo", reply_ok).unwrap();
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let mut services = Services::new();
        let err = services
            .add("post://127.0.0.1:3380/echo", reply_ok)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnsupportedScheme(Scheme::Post)
        ));

        let err = services
            .add("https://127.0.0.1:3380/echo", reply_ok)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnsupportedScheme(Scheme::Https)
        ));
    }

    #[test]
    fn test_unparsable_address_rejected() {
        let mut services = Services::new();
        let err = services.add("not an address", reply_ok).unwrap_err();
        assert!(matches!(err, RegistryError::Address(_)));
    }

    #[tokio::test]
    async fn test_serve_without_services_rejected() {
        let err = Services::new()
            .serve(&EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServeError::Empty));
    }

    #[tokio::test]
    async fn test_paths_on_one_authority_share_a_listener() {
        let mut services = Services::new();
        services.add("http://127.0.0.1:0/first", reply_ok).unwrap();
        services.add("http://127.0.0.1:0/second", reply_ok).unwrap();

        let handle = services.serve(&EngineConfig::default()).await.unwrap();
        assert_eq!(handle.local_addrs().len(), 1);
        assert_ne!(handle.local_addr().port(), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_distinct_authorities_get_distinct_listeners() {
        let mut services = Services::new();
        services.add("http://127.0.0.1:0/first", reply_ok).unwrap();
        services.add("http://0.0.0.0:0/second", reply_ok).unwrap();

        let handle = services.serve(&EngineConfig::default()).await.unwrap();
        assert_eq!(handle.local_addrs().len(), 2);
        handle.shutdown().await;
    }
}
