//! Pipelined connection handling.
//!
//! # Responsibilities
//! - Read a stream of requests off one socket, in arrival order
//! - Assign each request a per-connection sequence number and dispatch it
//!   to the shared worker pool without blocking the read loop
//! - Write responses back strictly in sequence order, whatever order the
//!   handlers finish in
//! - Apply the HTTP/1.0 vs HTTP/1.1 lifecycle rules per response
//!
//! # Design Decisions
//! - The socket splits into a reader and a spawned writer; they share one
//!   bounded mpsc of pending requests, so the queue itself is the reorder
//!   buffer: the writer awaits each slot in order and an early-completed
//!   response just sits in its oneshot until its turn
//! - A dropped reply slot becomes a 503 for that sequence slot; the
//!   connection and its other requests are unaffected
//! - Malformed input gets a 400 queued behind the pending responses, then
//!   the connection closes
//! - Read timeouts stop reading but still drain queued responses; write
//!   failures and hard read errors abort and discard

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};

use crate::http::parse::{self, IncomingRequest, MAX_HEAD_BYTES};
use crate::http::response::ResponseEnvelope;
use crate::http::Version;
use crate::observability::{metrics, suppress};
use crate::service::workers::DispatchPool;
use crate::service::{Handler, ReplySlot, ServerRequest};

/// Handlers of one bind authority, keyed by exact path.
pub(crate) type ServiceMap = HashMap<String, Arc<dyn Handler>>;

/// How many parsed-but-unanswered requests one connection may hold.
/// A full queue backpressures the read loop.
const PENDING_QUEUE_DEPTH: usize = 32;

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConnectionId(u64);

impl ConnectionId {
    /// Relaxed ordering is enough; only uniqueness matters.
    pub(crate) fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Everything a connection needs besides its socket.
#[derive(Clone)]
pub(crate) struct ConnectionContext {
    pub services: Arc<ServiceMap>,
    pub pool: DispatchPool,
    pub io_timeout: Duration,
}

/// One response the writer still owes the client.
///
/// `slot` completes when the handler replies; `version` and `keep_alive`
/// let the writer synthesize an error response with the right lifecycle
/// when the slot is dropped instead.
struct PendingRequest {
    seq: u64,
    version: Version,
    keep_alive: bool,
    slot: oneshot::Receiver<ResponseEnvelope>,
}

/// The lifecycle decision table.
///
/// HTTP/1.0 always closes after its single reply. HTTP/1.1 stays open
/// unless the request carried `Connection: close`.
fn keep_alive(version: Version, connection_header: Option<&str>) -> bool {
    match version {
        Version::Http10 => false,
        Version::Http11 => {
            !matches!(connection_header, Some(value) if value.eq_ignore_ascii_case("close"))
        }
    }
}

/// Run one connection to completion.
pub(crate) async fn drive<S>(id: ConnectionId, peer: SocketAddr, stream: S, ctx: ConnectionContext)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    metrics::record_connection_opened();

    let (read_half, write_half) = tokio::io::split(stream);
    let (queue_tx, queue_rx) = mpsc::channel::<PendingRequest>(PENDING_QUEUE_DEPTH);

    let writer = tokio::spawn(write_loop(id, write_half, queue_rx, ctx.io_timeout));
    let drain = read_loop(id, peer, read_half, queue_tx, &ctx).await;

    // read_loop returning dropped the queue sender; on a clean stop the
    // writer finishes whatever is pending, on a hard transport error the
    // undelivered responses are discarded with the connection.
    if !drain {
        writer.abort();
    }
    let _ = writer.await;

    metrics::record_connection_closed();
    tracing::debug!(conn = %id, peer = %peer, "Connection finished");
}

/// Returns false only on a hard transport error, in which case the writer
/// is aborted rather than drained.
async fn read_loop<S>(
    id: ConnectionId,
    peer: SocketAddr,
    mut read_half: ReadHalf<S>,
    queue: mpsc::Sender<PendingRequest>,
    ctx: &ConnectionContext,
) -> bool
where
    S: AsyncRead,
{
    let mut buf = BytesMut::with_capacity(8 * 1024);
    let mut seq: u64 = 0;
    let mut reading = true;

    while reading {
        // Drain every complete request already buffered before reading more.
        loop {
            match parse::parse_request(&mut buf, MAX_HEAD_BYTES) {
                Ok(Some(request)) => {
                    let keep = keep_alive(request.version, request.header("connection"));
                    if !dispatch_request(id, seq, request, keep, &queue, ctx).await {
                        return true;
                    }
                    seq += 1;
                    if !keep {
                        reading = false;
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(conn = %id, peer = %peer, error = %err, "Malformed request; closing after pending responses");
                    let (tx, rx) = oneshot::channel();
                    let _ = tx.send(ResponseEnvelope::error(Version::Http11, false, 400));
                    let _ = queue
                        .send(PendingRequest {
                            seq,
                            version: Version::Http11,
                            keep_alive: false,
                            slot: rx,
                        })
                        .await;
                    reading = false;
                    break;
                }
            }
        }
        if !reading {
            break;
        }

        match tokio::time::timeout(ctx.io_timeout, read_half.read_buf(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                tracing::debug!(conn = %id, peer = %peer, error = %err, "Read failed; aborting connection");
                return false;
            }
            Err(_) => {
                tracing::debug!(conn = %id, peer = %peer, "Read timed out; closing");
                break;
            }
        }
    }
    true
}

/// Queue the sequence slot, then hand the request to its handler (or fill
/// the slot with a 404). Returns false when the writer is gone.
async fn dispatch_request(
    id: ConnectionId,
    seq: u64,
    request: IncomingRequest,
    keep: bool,
    queue: &mpsc::Sender<PendingRequest>,
    ctx: &ConnectionContext,
) -> bool {
    let version = request.version;
    let (tx, rx) = oneshot::channel();
    let pending = PendingRequest {
        seq,
        version,
        keep_alive: keep,
        slot: rx,
    };
    if queue.send(pending).await.is_err() {
        return false;
    }

    let path = request.path().to_string();
    match ctx.services.get(&path) {
        Some(handler) => {
            let data = match request.query() {
                Some(query) if !query.is_empty() => Bytes::copy_from_slice(query.as_bytes()),
                _ => request.body.clone(),
            };
            let IncomingRequest {
                method, headers, ..
            } = request;
            let server_request = ServerRequest {
                method,
                service: path,
                data,
                headers,
                slot: ReplySlot {
                    tx,
                    version,
                    keep_alive: keep,
                },
            };
            tracing::debug!(conn = %id, seq, service = %server_request.service, "Request dispatched");
            ctx.pool.dispatch(handler.serve(server_request)).await;
        }
        None => {
            tracing::debug!(conn = %id, seq, path = %path, "No service registered");
            let _ = tx.send(ResponseEnvelope::error(version, keep, 404));
        }
    }
    true
}

/// Pop pending requests strictly in arrival order and write each response
/// as its slot completes. This is the reorder point: slot N+1 may fill
/// long before slot N, and still waits.
async fn write_loop<S>(
    id: ConnectionId,
    mut write_half: WriteHalf<S>,
    mut queue: mpsc::Receiver<PendingRequest>,
    io_timeout: Duration,
) where
    S: AsyncWrite + Send + 'static,
{
    while let Some(pending) = queue.recv().await {
        let envelope = match pending.slot.await {
            Ok(envelope) => envelope,
            Err(_) => {
                if suppress::first_dropped_reply() {
                    tracing::warn!(conn = %id, seq = pending.seq, "Handler dropped a request without replying; answering 503 (logged once at warn)");
                } else {
                    tracing::debug!(conn = %id, seq = pending.seq, "Handler dropped a request without replying; answering 503");
                }
                metrics::record_handler_failure();
                ResponseEnvelope::error(pending.version, pending.keep_alive, 503)
            }
        };

        let write = async {
            write_half.write_all(&envelope.bytes).await?;
            write_half.flush().await
        };
        match tokio::time::timeout(io_timeout, write).await {
            Ok(Ok(())) => {
                metrics::record_request(envelope.status);
                tracing::trace!(conn = %id, seq = pending.seq, status = envelope.status, "Response written");
            }
            Ok(Err(err)) => {
                tracing::debug!(conn = %id, error = %err, "Write failed; aborting connection");
                return;
            }
            Err(_) => {
                tracing::debug!(conn = %id, "Write timed out; aborting connection");
                return;
            }
        }

        if envelope.close {
            let _ = write_half.shutdown().await;
            return;
        }
    }

    // Reader stopped and every pending response is on the wire.
    let _ = write_half.shutdown().await;
}
