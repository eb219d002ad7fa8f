//! Client-side request serialization.
//!
//! # Responsibilities
//! - Enforce per-scheme build legality (`full`/`fulls` never rebuild,
//!   `post` never combines with url parts)
//! - Select the method: explicit choice, then scheme, then payload shape
//! - Assemble the exact wire form: request line, Host, caller headers,
//!   framing overrides, blank line, body
//! - Rewrite the message address to the built scheme tag on success
//!
//! # Design Decisions
//! - `build_into` takes `&self`, so one configured builder can serialize
//!   any number of messages
//! - All failure paths are checked before the message is touched; a failed
//!   build leaves address and data exactly as they were
//! - `Content-Length` mirrors the body byte count and is never emitted for
//!   an empty body; caller-supplied occurrences are stripped either way
//! - The request target is origin-form unless `absolute_uri` is set, in
//!   which case the original scheme (not the built tag) leads the target

use thiserror::Error;

use crate::address::{Address, AddressError, Scheme};
use crate::http::headers::HeaderBlock;
use crate::http::Method;
use crate::message::Message;

/// Errors produced while building a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The address scheme is not one the engine knows how to handle.
    #[error("unrecognized scheme in address: {0}")]
    UnrecognizedScheme(String),

    /// The address is not a well-formed `scheme://host[:port][/path]`.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The message data already holds a serialized request.
    #[error("message is already a serialized request")]
    AlreadyBuilt,

    /// The `post` scheme cannot be combined with url parts.
    #[error("post scheme cannot be combined with url parts")]
    InvalidCombination,
}

impl From<AddressError> for BuildError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::UnrecognizedScheme(s) => BuildError::UnrecognizedScheme(s),
            AddressError::Invalid(s) => BuildError::InvalidAddress(s),
        }
    }
}

/// Serializes messages into wire-exact HTTP/1.1 requests.
///
/// All inputs are optional; an empty builder turns
/// `http://host:port/path` into `GET /path HTTP/1.1` with just a Host
/// header. See `build_into` for the full set of rules.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    url_parts: Vec<String>,
    headers: String,
    body: Vec<u8>,
    content_type: String,
    method: Option<Method>,
    absolute_uri: bool,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one raw `key=value` query fragment.
    pub fn url_part(mut self, part: impl Into<String>) -> Self {
        self.url_parts.push(part.into());
        self
    }

    /// Append several raw query fragments, in order.
    pub fn url_parts<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.url_parts.extend(parts.into_iter().map(Into::into));
        self
    }

    /// Raw CRLF-joined header text, passed through with original order,
    /// casing and spacing except for the framing overrides.
    pub fn raw_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    /// The request body, copied verbatim after the blank line.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Injected as the `Content-Type` header, replacing any caller-supplied
    /// occurrence. Empty means leave the caller's headers alone.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Explicit method, overriding scheme and payload-shape defaults.
    /// PUT and DELETE are only reachable this way.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Emit an absolute-URI request target (`http://host:port/path`)
    /// instead of the origin form. The Host header is still emitted.
    pub fn absolute_uri(mut self, absolute: bool) -> Self {
        self.absolute_uri = absolute;
        self
    }

    /// Serialize into `message.data` and retag `message.addr` with the
    /// built scheme (`full`, or `fulls` for secure schemes).
    ///
    /// Rules, in order:
    /// 1. `full`/`fulls` addresses fail with `AlreadyBuilt`.
    /// 2. `post` scheme with url parts fails with `InvalidCombination`.
    /// 3. Url parts join with `&` behind a single `?` on the path.
    /// 4. Method: explicit wins, then `post` scheme implies POST, then a
    ///    non-empty body or url parts imply POST, else GET.
    /// 5. `Content-Type` (when given) and `Content-Length` replace every
    ///    caller occurrence and land at the end of the block, in that
    ///    order. An empty body strips `Content-Length` without re-adding.
    /// 6. `Host: host:port` is always the second line.
    ///
    /// Failure leaves the message untouched.
    pub fn build_into(&self, message: &mut Message) -> Result<(), BuildError> {
        let addr = Address::parse(&message.addr)?;

        match addr.scheme {
            Scheme::Full | Scheme::Fulls => return Err(BuildError::AlreadyBuilt),
            Scheme::Post if !self.url_parts.is_empty() => {
                return Err(BuildError::InvalidCombination)
            }
            _ => {}
        }

        let method = match self.method {
            Some(method) => method,
            None if addr.scheme == Scheme::Post => Method::Post,
            None if !self.body.is_empty() || !self.url_parts.is_empty() => Method::Post,
            None => Method::Get,
        };

        let mut path = addr.path.clone();
        if !self.url_parts.is_empty() {
            path.push('?');
            path.push_str(&self.url_parts.join("&"));
        }

        let authority = addr.authority();
        let target = if self.absolute_uri {
            format!("{}://{}{}", addr.scheme, authority, path)
        } else {
            path
        };

        let mut block = HeaderBlock::parse(&self.headers);
        if !self.content_type.is_empty() {
            block.override_header("Content-Type", &self.content_type);
        }
        if self.body.is_empty() {
            block.override_header("Content-Length", "");
        } else {
            block.override_header("Content-Length", &self.body.len().to_string());
        }

        let mut data =
            Vec::with_capacity(64 + target.len() + self.headers.len() + self.body.len());
        data.extend_from_slice(method.as_str().as_bytes());
        data.push(b' ');
        data.extend_from_slice(target.as_bytes());
        data.extend_from_slice(b" HTTP/1.1\r\nHost: ");
        data.extend_from_slice(authority.as_bytes());
        data.extend_from_slice(b"\r\n");
        block.write_to(&mut data);
        data.extend_from_slice(b"\r\n");
        data.extend_from_slice(&self.body);

        let tag = addr.scheme.built_scheme();
        message.addr = match message.addr.split_once("://") {
            Some((_, rest)) => format!("{}://{}", tag, rest),
            None => format!("{}://{}{}", tag, authority, addr.path),
        };
        message.data = data;
        Ok(())
    }
}
