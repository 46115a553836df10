//! Contract validation for the swarm host.
//!
//! Validation never answers with a bare boolean: every check contributes
//! [`Violation`](agent_primitives::Violation)s to a [`ValidationReport`], split
//! into blocking errors and non-blocking warnings.

#![warn(missing_docs, clippy::pedantic)]

pub mod report;
pub mod rules;
pub mod validator;

pub use report::ValidationReport;
pub use rules::{ContractRule, RuleFindings, ValidatorConfig};
pub use validator::ContractValidator;
