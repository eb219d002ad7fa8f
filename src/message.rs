//! The RPC message envelope.
//!
//! A message is just an address plus opaque payload bytes. Before building,
//! `data` holds the caller's request payload (possibly empty); after the
//! request builder runs, `addr` is rewritten to the `full`/`fulls` scheme
//! and `data` holds the complete serialized HTTP request.

/// An addressed payload travelling through the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Destination address, `scheme://host[:port][/path]`.
    pub addr: String,
    /// Payload bytes; a serialized request once the message is built.
    pub data: Vec<u8>,
}

impl Message {
    /// Create an empty message for the given address.
    pub fn from_addr(addr: impl Into<String>) -> Self {
        Message {
            addr: addr.into(),
            data: Vec::new(),
        }
    }

    /// Whether the address carries the built-request scheme tag.
    pub fn is_built(&self) -> bool {
        self.addr.starts_with("full://") || self.addr.starts_with("fulls://")
    }
}
