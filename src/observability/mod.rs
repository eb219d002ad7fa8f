//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Connections and the writer loop produce:
//!     → tracing events (structured fields: conn, seq, peer, status)
//!     → metrics.rs (counters: connections, responses by status,
//!       handler failures)
//!
//! Consumers:
//!     → Log output is configured by the embedding binary
//!     → A metrics recorder, if the embedder installs one; the engine
//!       only emits
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap (atomic increments behind the macros)
//! - The swallowed-failure warning is rate-limited to one per process
//!   (suppress.rs), everything after that logs at debug

pub mod metrics;
pub mod suppress;
