//! Errors raised while binding and invoking capabilities.

use agent_primitives::ContractId;
use thiserror::Error;

/// Result alias for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result alias for tool lookups and invocations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Failures of a registration pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Two distinct contracts derive the same tool name.
    #[error("tool `{tool_name}` is claimed by both `{first}` and `{second}`")]
    Conflict {
        /// The colliding tool name.
        tool_name: String,
        /// Contract that claimed the name first.
        first: ContractId,
        /// Contract that collided with it.
        second: ContractId,
    },

    /// The contract does not enable protocol exposure.
    #[error("contract `{id}` is not capability-enabled")]
    NotExposed {
        /// Offending contract.
        id: ContractId,
    },

    /// A capability could not be derived from the contract.
    #[error("invalid capability for `{id}`: {reason}")]
    InvalidCapability {
        /// Offending contract.
        id: ContractId,
        /// Why the capability was rejected.
        reason: String,
    },
}

/// Failures of a tool lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is bound.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Requested name.
        name: String,
    },
}
