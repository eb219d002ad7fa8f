//! Server response serialization.
//!
//! The wire layout is fixed: status line, `Content-Length`, then
//! `Connection: Keep-Alive` only when the connection stays open, then any
//! handler-supplied headers in their given order, blank line, body.
//! Responses always carry a Content-Length, including zero; without it a
//! client cannot frame the body on a kept-alive connection.

use bytes::Bytes;

use crate::http::Version;

/// A serialized response plus the lifecycle verdict for its connection.
///
/// Built once, when the reply is produced; the connection writer only
/// moves bytes and reads `close`.
#[derive(Debug)]
pub(crate) struct ResponseEnvelope {
    pub status: u16,
    pub bytes: Bytes,
    pub close: bool,
}

impl ResponseEnvelope {
    /// Serialize a response. `keep_alive` decides both the
    /// `Connection: Keep-Alive` header and the close verdict.
    pub(crate) fn new(
        version: Version,
        keep_alive: bool,
        status: u16,
        reason: &str,
        extra_headers: &[(&str, &str)],
        body: &[u8],
    ) -> Self {
        let mut data = Vec::with_capacity(96 + body.len());
        data.extend_from_slice(version.as_str().as_bytes());
        data.push(b' ');
        data.extend_from_slice(status.to_string().as_bytes());
        data.push(b' ');
        data.extend_from_slice(reason.as_bytes());
        data.extend_from_slice(b"\r\nContent-Length: ");
        data.extend_from_slice(body.len().to_string().as_bytes());
        data.extend_from_slice(b"\r\n");
        if keep_alive {
            data.extend_from_slice(b"Connection: Keep-Alive\r\n");
        }
        for (name, value) in extra_headers {
            data.extend_from_slice(name.as_bytes());
            data.extend_from_slice(b": ");
            data.extend_from_slice(value.as_bytes());
            data.extend_from_slice(b"\r\n");
        }
        data.extend_from_slice(b"\r\n");
        data.extend_from_slice(body);

        ResponseEnvelope {
            status,
            bytes: data.into(),
            close: !keep_alive,
        }
    }

    /// An empty-bodied error response for a sequence slot.
    pub(crate) fn error(version: Version, keep_alive: bool, status: u16) -> Self {
        ResponseEnvelope::new(version, keep_alive, status, canonical_reason(status), &[], &[])
    }
}

/// Reason phrases for the statuses the engine generates itself.
pub(crate) fn canonical_reason(status: u16) -> &'static str {
    match status {
        200 => "Ok",
        400 => "Bad Request",
        404 => "Not Found",
        503 => "Service Unavailable",
        _ => "Error",
    }
}
