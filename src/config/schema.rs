//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! transport engine. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the transport engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Dispatch pool configuration.
    pub workers: WorkersConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Built-in echo service configuration.
    pub echo: EchoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind authority for the daemon's services (e.g., "127.0.0.1:3380").
    pub bind_address: String,

    /// Maximum concurrent connections per listener (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3380".to_string(),
            max_connections: 1024,
        }
    }
}

/// Dispatch pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Number of requests processed concurrently across all connections.
    pub pool_size: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { pool_size: 16 }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Socket read/write timeout in seconds. A connection idle past this
    /// is drained of its pending responses and closed.
    pub io_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { io_secs: 60 }
    }
}

/// Built-in echo service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Path the echo service is registered under.
    pub path: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            path: "/echo".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
