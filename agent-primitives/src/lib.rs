//! Core shared types for contract-driven agents.
//!
//! An [`AgentContract`] is the validated, immutable definition of one agent.
//! Contracts arrive as flat [`ContractRecord`] property bags, are parsed into a
//! [`ContractDraft`] and, once validated, handed to the rest of the runtime.

#![warn(missing_docs, clippy::pedantic)]

mod batch;
mod context;
mod contract;
mod error;
mod execution;
mod ids;
mod schema;
mod violation;
mod wire;

/// Best-effort batch processing that keeps per-item failures.
pub use batch::{BatchFailure, BatchOutcome, process_batch};
/// Per-invocation context supplied by callers.
pub use context::{ExecutionContext, Priority};
/// Contract model and its closed enumerations.
pub use contract::{
    AgentContract, AgentContractBuilder, AgentRole, AutonomyLevel, ContractStatus,
    ExecutionPattern, derive_tool_name, normalize_model_identifier,
};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Structured failure of a single capability invocation.
pub use execution::{ExecutionError, ExecutionErrorKind, ExecutionResult};
/// Identifiers for contracts and invocation traces.
pub use ids::{ContractId, TraceId};
/// Parsed invocation schema attached to each contract.
pub use schema::InvocationSchema;
/// Validation findings and their configurable severities.
pub use violation::{RuleSeverity, Violation, ViolationKind};
/// Flat wire representation of contracts.
pub use wire::{ContractDraft, ContractRecord, fields};
