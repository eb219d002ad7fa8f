//! Incremental parsing of inbound requests.
//!
//! # Responsibilities
//! - Frame one request at a time out of a connection read buffer: head up
//!   to the blank line, then exactly Content-Length body bytes
//! - Leave partial requests and pipelined leftovers in the buffer
//! - Classify malformed input so the connection can answer 400 and close
//!
//! # Design Decisions
//! - The buffer is only consumed once a request is complete; a partial
//!   head or body leaves it byte-for-byte intact for the next read
//! - Methods arrive as raw tokens; the engine routes on path, not method
//! - No chunked transfer-encoding: a request body exists exactly when a
//!   Content-Length header says so

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::http::Version;

/// Upper bound on request line plus headers.
pub const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Reasons an inbound byte stream stops being a parseable request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// No blank line within the head size limit.
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// Request line is not `METHOD target HTTP/x.y` (or head is not UTF-8).
    #[error("malformed request line")]
    BadRequestLine,

    /// The version token is not HTTP/1.0 or HTTP/1.1.
    #[error("unsupported protocol version")]
    BadVersion,

    /// A header line has no name before the colon, or no colon at all.
    #[error("malformed header line")]
    BadHeader,

    /// Content-Length is not a base-10 integer, or too large to frame.
    #[error("invalid Content-Length")]
    BadContentLength,
}

/// One fully framed inbound request.
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: String,
    pub target: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl IncomingRequest {
    /// The target in origin form. A proxy-style absolute-form target
    /// drops its `scheme://authority` prefix; one with no path at all
    /// maps to `/`.
    fn origin_form(&self) -> &str {
        if self.target.starts_with('/') {
            return &self.target;
        }
        match self.target.find("://") {
            Some(scheme_end) => {
                let rest = &self.target[scheme_end + 3..];
                match rest.find('/') {
                    Some(path_start) => &rest[path_start..],
                    None => "/",
                }
            }
            None => &self.target,
        }
    }

    /// The target path without its query string.
    pub fn path(&self) -> &str {
        let origin = self.origin_form();
        match origin.split_once('?') {
            Some((path, _)) => path,
            None => origin,
        }
    }

    /// The query string after `?`, if any.
    pub fn query(&self) -> Option<&str> {
        self.origin_form().split_once('?').map(|(_, query)| query)
    }

    /// First header with the given name, ASCII case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Try to frame one request out of `buf`.
///
/// Returns `Ok(None)` when more bytes are needed. On success the request's
/// bytes are consumed from `buf`; whatever follows (the next pipelined
/// request) stays put.
pub fn parse_request(
    buf: &mut BytesMut,
    max_head: usize,
) -> Result<Option<IncomingRequest>, ParseError> {
    let head_end = match find_head_end(buf) {
        Some(end) => end,
        None => {
            if buf.len() > max_head {
                return Err(ParseError::HeadTooLarge(max_head));
            }
            return Ok(None);
        }
    };
    if head_end > max_head {
        return Err(ParseError::HeadTooLarge(max_head));
    }

    let head = std::str::from_utf8(&buf[..head_end]).map_err(|_| ParseError::BadRequestLine)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(ParseError::BadRequestLine)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(ParseError::BadRequestLine)?;
    let target = parts.next().ok_or(ParseError::BadRequestLine)?;
    let version_token = parts.next().ok_or(ParseError::BadRequestLine)?;
    if parts.next().is_some() {
        return Err(ParseError::BadRequestLine);
    }
    let version = Version::parse(version_token).ok_or(ParseError::BadVersion)?;

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or(ParseError::BadHeader)?;
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            return Err(ParseError::BadHeader);
        }
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().map_err(|_| ParseError::BadContentLength)?;
        }
        headers.push((name.to_string(), value.to_string()));
    }

    let body_start = head_end + 4;
    // An advertised body no frame can hold is malformed, not a
    // wait-for-more-bytes case.
    let frame_len = body_start
        .checked_add(content_length)
        .ok_or(ParseError::BadContentLength)?;
    if buf.len() < frame_len {
        return Ok(None);
    }

    let method = method.to_string();
    let target = target.to_string();
    let frame = buf.split_to(frame_len).freeze();
    let body = frame.slice(body_start..);

    Ok(Some(IncomingRequest {
        method,
        target,
        version,
        headers,
        body,
    }))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}
