//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (connection limits, pool size, timeouts > 0)
//! - Check the bind authority and echo path are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over EngineConfig
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::EngineConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Bind address is not `host:port`.
    #[error("listener.bind_address must be host:port, got {0:?}")]
    BindAddress(String),
    /// Connection limit of zero would refuse every connection.
    #[error("listener.max_connections must be at least 1")]
    MaxConnections,
    /// Pool size of zero would never dispatch a request.
    #[error("workers.pool_size must be at least 1")]
    PoolSize,
    /// Zero timeout would fail every socket operation.
    #[error("timeouts.io_secs must be at least 1")]
    IoTimeout,
    /// Service paths are rooted.
    #[error("echo.path must start with '/', got {0:?}")]
    EchoPath(String),
    /// Unknown log level.
    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check every semantic rule, collecting all violations.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // The host part may be a name, so only the port is parsed.
    let addr = &config.listener.bind_address;
    let addr_ok = addr
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);
    if !addr_ok {
        errors.push(ValidationError::BindAddress(addr.clone()));
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }

    if config.workers.pool_size == 0 {
        errors.push(ValidationError::PoolSize);
    }

    if config.timeouts.io_secs == 0 {
        errors.push(ValidationError::IoTimeout);
    }

    if !config.echo.path.starts_with('/') {
        errors.push(ValidationError::EchoPath(config.echo.path.clone()));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
