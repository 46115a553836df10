//! Failure of a single capability invocation.

use std::time::Duration;

use thiserror::Error;

use crate::ids::ContractId;

/// Result alias for capability execution.
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// What went wrong while executing a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// No backend client could be obtained for the resolved model.
    ModelUnavailable {
        /// Underlying reason.
        message: String,
    },
    /// The backend call failed (network, authentication, quota, response).
    Backend {
        /// Underlying reason.
        message: String,
    },
    /// The backend did not answer within the configured timeout.
    Timeout {
        /// Elapsed budget.
        after: Duration,
    },
}

/// Structured invocation failure carrying the contract it was raised for.
///
/// Scoped to one invocation; it never affects sibling invocations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("execution failed for `{contract_id}`: {}", describe(.kind))]
pub struct ExecutionError {
    contract_id: ContractId,
    kind: ExecutionErrorKind,
}

impl ExecutionError {
    /// Creates an error for the supplied contract.
    #[must_use]
    pub fn new(contract_id: ContractId, kind: ExecutionErrorKind) -> Self {
        Self { contract_id, kind }
    }

    /// Convenience constructor for backend failures.
    #[must_use]
    pub fn backend(contract_id: ContractId, message: impl Into<String>) -> Self {
        Self::new(
            contract_id,
            ExecutionErrorKind::Backend {
                message: message.into(),
            },
        )
    }

    /// Convenience constructor for timeouts.
    #[must_use]
    pub fn timeout(contract_id: ContractId, after: Duration) -> Self {
        Self::new(contract_id, ExecutionErrorKind::Timeout { after })
    }

    /// Convenience constructor for model resolution failures.
    #[must_use]
    pub fn model_unavailable(contract_id: ContractId, message: impl Into<String>) -> Self {
        Self::new(
            contract_id,
            ExecutionErrorKind::ModelUnavailable {
                message: message.into(),
            },
        )
    }

    /// Returns the contract the failure belongs to.
    #[must_use]
    pub fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> &ExecutionErrorKind {
        &self.kind
    }

    /// Returns the underlying message.
    #[must_use]
    pub fn message(&self) -> String {
        describe(&self.kind)
    }

    /// Returns `true` for timeouts.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ExecutionErrorKind::Timeout { .. })
    }
}

fn describe(kind: &ExecutionErrorKind) -> String {
    match kind {
        ExecutionErrorKind::ModelUnavailable { message } => {
            format!("model unavailable: {message}")
        }
        ExecutionErrorKind::Backend { message } => message.clone(),
        ExecutionErrorKind::Timeout { after } => {
            format!("backend did not respond within {}ms", after.as_millis())
        }
    }
}
