//! Configuration for the swarm host.
//!
//! [`HostConfig::load`] layers built-in defaults, an optional JSON file, and
//! `SWARM_*` environment overrides through the `config` crate, then checks
//! value ranges.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigResult, ENV_PREFIX, ENV_SEPARATOR};
pub use schema::{DEFAULT_MODEL, ExecutionSection, GenerationSection, HostConfig, ServerSection, SourceSection};
