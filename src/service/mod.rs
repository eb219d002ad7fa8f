//! Handler API: what a registered service sees per request.
//!
//! # Responsibilities
//! - Define the `Handler` trait services implement (closures included)
//! - Carry one parsed request plus its one-shot reply slot into a handler
//! - Turn `send_reply`/`send_error` into a serialized response envelope
//!
//! # Design Decisions
//! - `ServerRequest` owns its reply slot and the reply methods consume
//!   `self`, so a request is answered at most once by construction
//! - Dropping a request without replying is legal; the connection writer
//!   fills that sequence slot with a 503 so ordering never stalls
//! - The payload (`data`) is the query string when the target has one,
//!   else the body

pub mod registry;
pub mod workers;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::http::response::ResponseEnvelope;
use crate::http::Version;

/// Boxed future returned by handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered service endpoint.
///
/// Implemented for free by any `Fn(ServerRequest) -> impl Future` closure,
/// which is how most services are written.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, request: ServerRequest) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(ServerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn serve(&self, request: ServerRequest) -> HandlerFuture {
        Box::pin((self)(request))
    }
}

/// The reply side of one pending request.
///
/// Carries the oneshot sender the connection writer is waiting on, plus
/// the protocol facts needed to serialize a response for this slot.
#[derive(Debug)]
pub(crate) struct ReplySlot {
    pub tx: oneshot::Sender<ResponseEnvelope>,
    pub version: Version,
    pub keep_alive: bool,
}

impl ReplySlot {
    /// Fill the slot. Errors are ignored: a gone receiver means the
    /// connection already died, and the response has nowhere to go.
    fn fill(self, envelope: ResponseEnvelope) {
        let _ = self.tx.send(envelope);
    }
}

/// One inbound request as seen by a handler.
#[derive(Debug)]
pub struct ServerRequest {
    pub(crate) method: String,
    pub(crate) service: String,
    pub(crate) data: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) slot: ReplySlot,
}

impl ServerRequest {
    /// The request path, without its query string.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The RPC payload: query string when present, else the body.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The raw method token of the request line.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// All request headers in arrival order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header with the given name, ASCII case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Answer with `200 Ok`.
    ///
    /// `extra_headers` are appended after the engine's framing headers in
    /// the given order. An extra `Connection: close` header forces the
    /// connection to close after this response; the engine then leaves
    /// its own `Connection: Keep-Alive` line out.
    pub fn send_reply(self, body: impl AsRef<[u8]>, extra_headers: &[(&str, &str)]) {
        let handler_close = extra_headers.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case("connection") && value.eq_ignore_ascii_case("close")
        });
        let keep_alive = self.slot.keep_alive && !handler_close;
        let envelope = ResponseEnvelope::new(
            self.slot.version,
            keep_alive,
            200,
            "Ok",
            extra_headers,
            body.as_ref(),
        );
        self.slot.fill(envelope);
    }

    /// Answer with an empty-bodied error status.
    pub fn send_error(self, status: u16, reason: &str) {
        let envelope = ResponseEnvelope::new(
            self.slot.version,
            self.slot.keep_alive,
            status,
            reason,
            &[],
            &[],
        );
        self.slot.fill(envelope);
    }
}
