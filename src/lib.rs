//! Pipelined HTTP/1.x RPC Transport Engine

pub mod address;
pub mod config;
pub mod http;
pub mod message;
pub mod net;
pub mod observability;
pub mod service;

pub use address::{Address, Scheme};
pub use config::schema::EngineConfig;
pub use http::builder::{BuildError, RequestBuilder};
pub use http::Method;
pub use message::Message;
pub use service::registry::{ServerHandle, Services};
pub use service::{Handler, ServerRequest};
