//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bounded accept, connection permits)
//!     → connection.rs (split reader/writer, pipelined request loop)
//!     → Dispatched to registered handlers via service layer
//!
//! Connection lifetime:
//!     Accepted → Reading/Writing (pipelined) → Draining → Closed
//! ```
//!
//! # Design Decisions
//! - Semaphore-bounded accept prevents resource exhaustion
//! - Reader and writer halves run independently so slow handlers
//!   never stall request intake
//! - Responses leave in request order regardless of completion order

pub mod connection;
pub mod listener;
