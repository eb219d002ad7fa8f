//! HTTP/1.x wire handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client side:
//!     Message { addr, data }
//!         → builder.rs (scheme checks, method defaulting, header merge)
//!         → Message { full://…, serialized request bytes }
//!
//! Server side:
//!     TCP connection
//!         → parse.rs (incremental request framing off the read buffer)
//!         → [service layer runs the handler]
//!         → response.rs (status line, framing headers, lifecycle header)
//!         → written back in request-arrival order
//! ```

pub mod builder;
pub mod headers;
pub mod parse;
pub mod response;

pub use builder::{BuildError, RequestBuilder};
pub use headers::HeaderBlock;

/// Request methods the client-side builder can emit.
///
/// Inbound requests keep their method as a raw token; this closed set only
/// constrains what the builder writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol versions the engine speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    /// Parse the version token of a request line.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
