//! Validation reports returned by the validator.

use agent_primitives::{AgentContract, Violation};
use serde::Serialize;

/// Outcome of validating one contract record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    record_id: Option<String>,
    errors: Vec<Violation>,
    warnings: Vec<Violation>,
    #[serde(skip)]
    contract: Option<AgentContract>,
}

impl ValidationReport {
    pub(crate) fn new(
        record_id: Option<String>,
        errors: Vec<Violation>,
        warnings: Vec<Violation>,
        contract: Option<AgentContract>,
    ) -> Self {
        let contract = if errors.is_empty() { contract } else { None };
        Self {
            record_id,
            errors,
            warnings,
            contract,
        }
    }

    /// Returns a report for input that could not be decoded at all.
    #[must_use]
    pub fn unreadable(violation: Violation) -> Self {
        Self::new(None, vec![violation], Vec::new(), None)
    }

    /// Returns `true` when no blocking error was found; warnings are allowed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the identifier read from the record, if any.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Returns the blocking errors.
    #[must_use]
    pub fn errors(&self) -> &[Violation] {
        &self.errors
    }

    /// Returns the non-blocking warnings.
    #[must_use]
    pub fn warnings(&self) -> &[Violation] {
        &self.warnings
    }

    /// Returns the validated contract; present only when the report is valid.
    #[must_use]
    pub fn contract(&self) -> Option<&AgentContract> {
        self.contract.as_ref()
    }

    /// Consumes the report, yielding the validated contract.
    #[must_use]
    pub fn into_contract(self) -> Option<AgentContract> {
        self.contract
    }

    pub(crate) fn push_error(&mut self, violation: Violation) {
        self.errors.push(violation);
        self.contract = None;
    }
}
