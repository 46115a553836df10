//! Observability setup for the swarm host.
//!
//! Stdout carries the protocol channel, so every subscriber installed here
//! writes to stderr.

#![warn(missing_docs, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives, e.g. `info,agent_kernel=debug`.
    pub filter: String,
    /// Emit ANSI colours.
    pub ansi: bool,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            ansi: false,
            with_target: true,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directives could not be parsed.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Offending directives.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Builds the filter, preferring `RUST_LOG` when it is set.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directives
/// do not parse.
pub fn build_filter(config: &TelemetryConfig) -> TelemetryResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return Ok(filter);
    }
    parse_filter(&config.filter)
}

fn parse_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|err| TelemetryError::InvalidFilter {
        filter: directives.to_owned(),
        reason: err.to_string(),
    })
}

/// Installs the global `tracing` subscriber writing to stderr.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> TelemetryResult<()> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .compact()
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialized(err.to_string()))?;

    tracing::debug!(filter = %config.filter, "tracing initialised");
    Ok(())
}
