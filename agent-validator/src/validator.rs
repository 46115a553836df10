//! Contract validator combining structural checks with business rules.

use std::collections::HashSet;

use agent_primitives::{
    AgentContract, BatchFailure, BatchOutcome, ContractDraft, ContractRecord, Violation, fields,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::report::ValidationReport;
use crate::rules::{ContractRule, RuleFindings, ValidatorConfig, default_rules};

/// Validates raw contract records into typed [`AgentContract`]s.
///
/// Every record goes through the structural pass first and then through every
/// registered rule, so a single report lists all findings at once.
pub struct ContractValidator {
    rules: Vec<Box<dyn ContractRule>>,
}

impl std::fmt::Debug for ContractValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractValidator")
            .field("rules", &self.rules.iter().map(|rule| rule.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ContractValidator {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}

impl ContractValidator {
    /// Creates a validator with the built-in rules configured by `config`.
    #[must_use]
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            rules: default_rules(config),
        }
    }

    /// Appends a rule, evaluated after the existing ones.
    pub fn add_rule(&mut self, rule: Box<dyn ContractRule>) {
        self.rules.push(rule);
    }

    /// Validates one raw record.
    #[must_use]
    pub fn validate(&self, record: &ContractRecord) -> ValidationReport {
        let (draft, mut errors) = ContractDraft::from_record(record);

        let mut findings = RuleFindings::default();
        for rule in &self.rules {
            let before = findings.errors.len() + findings.warnings.len();
            rule.check(&draft, &mut findings);
            if findings.errors.len() + findings.warnings.len() > before {
                debug!(rule = rule.name(), id = ?record.agent_id(), "contract rule reported findings");
            }
        }
        errors.append(&mut findings.errors);

        let record_id = record.agent_id().map(str::to_owned);
        let contract = if errors.is_empty() {
            let contract = draft.into_contract();
            if contract.is_none() {
                errors.push(Violation::schema("root", "record could not be assembled into a contract"));
            }
            contract
        } else {
            None
        };

        ValidationReport::new(record_id, errors, findings.warnings, contract)
    }

    /// Validates JSON text holding a single record.
    ///
    /// Text that is not a JSON object yields a parse violation at `root`.
    #[must_use]
    pub fn validate_json(&self, text: &str) -> ValidationReport {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => match ContractRecord::from_value(value) {
                Some(record) => self.validate(&record),
                None => ValidationReport::unreadable(Violation::parse("contract must be a JSON object")),
            },
            Err(err) => ValidationReport::unreadable(Violation::parse(err.to_string())),
        }
    }

    /// Re-validates an already typed contract through its wire shape.
    #[must_use]
    pub fn validate_contract(&self, contract: &AgentContract) -> ValidationReport {
        self.validate(&contract.to_record())
    }

    /// Validates a batch, partitioning it into valid contracts and failures.
    ///
    /// A record whose identifier already appeared earlier in the batch fails
    /// with an error at `AgentID`. Warnings are logged and do not fail a record.
    pub fn validate_batch<I>(&self, records: I) -> BatchOutcome<AgentContract, ContractRecord, ValidationReport>
    where
        I: IntoIterator<Item = ContractRecord>,
    {
        let mut outcome = BatchOutcome::default();
        let mut seen = HashSet::new();

        for record in records {
            let mut report = self.validate(&record);
            if let Some(id) = report.contract().map(|contract| contract.id().as_str().to_owned()) {
                if !seen.insert(id.clone()) {
                    report.push_error(Violation::business(
                        fields::AGENT_ID,
                        format!("duplicate contract id `{id}` in batch"),
                    ));
                }
            }

            for warning in report.warnings() {
                warn!(id = ?report.record_id(), %warning, "contract validation warning");
            }

            match report.contract().cloned() {
                Some(contract) => outcome.succeeded.push(contract),
                None => outcome.failed.push(BatchFailure {
                    item: record,
                    error: report,
                }),
            }
        }
        outcome
    }
}
