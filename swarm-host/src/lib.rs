//! Contract-driven capability host.
//!
//! [`SwarmHost`] wires the contract registry, the tool host, the dispatcher
//! and the protocol server together. The runtime crates are re-exported so
//! embedders need a single dependency.

#![warn(missing_docs, clippy::pedantic)]

pub mod audit;
mod host;

pub use host::{HostError, HostResult, SwarmHost};

/// Contract model and shared types.
pub use agent_primitives as primitives;

/// Contract validation.
pub use agent_validator as validator;

/// Generation backends.
pub use agent_adapters as adapters;

/// Instruction rendering.
pub use agent_prompts as prompts;

/// Capability registration.
pub use agent_tools as tools;

/// Registry, dispatcher, and protocol server.
pub use agent_kernel as kernel;

/// Host configuration.
pub use agent_config as config;

/// Tracing setup.
pub use agent_telemetry as telemetry;
