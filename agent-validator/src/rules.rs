//! Business rules evaluated on top of structural validation.
//!
//! Each rule is independent and sees the partially parsed draft, so a record
//! with structural problems still gets every business finding reported.

use agent_primitives::{ContractDraft, RuleSeverity, Violation, fields};
use serde::{Deserialize, Serialize};

/// Severity and tag settings for the configurable rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Severity when a recursive pattern lacks the qualifying tag.
    pub recursive_pattern_severity: RuleSeverity,
    /// Tag that qualifies recursive and hybrid patterns.
    pub recursive_architecture_tag: String,
    /// Severity when a capability-enabled contract lacks the host tag.
    pub capability_architecture_severity: RuleSeverity,
    /// Tag expected on capability-enabled contracts.
    pub capability_architecture_tag: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            recursive_pattern_severity: RuleSeverity::Warning,
            recursive_architecture_tag: "RCOP".to_owned(),
            capability_architecture_severity: RuleSeverity::Warning,
            capability_architecture_tag: "MCP-Swarm".to_owned(),
        }
    }
}

/// Collects the findings of the rules run against one record.
#[derive(Debug, Default)]
pub struct RuleFindings {
    pub(crate) errors: Vec<Violation>,
    pub(crate) warnings: Vec<Violation>,
}

impl RuleFindings {
    /// Records a blocking error.
    pub fn error(&mut self, violation: Violation) {
        self.errors.push(violation);
    }

    /// Records a non-blocking warning.
    pub fn warn(&mut self, violation: Violation) {
        self.warnings.push(violation);
    }

    /// Records a finding at the supplied severity; `Off` drops it.
    pub fn report(&mut self, severity: RuleSeverity, violation: Violation) {
        match severity {
            RuleSeverity::Off => {}
            RuleSeverity::Warning => self.warn(violation),
            RuleSeverity::Error => self.error(violation),
        }
    }
}

/// A business rule over a contract draft.
pub trait ContractRule: Send + Sync {
    /// Short rule name used in logs.
    fn name(&self) -> &str;

    /// Evaluates the rule, recording any findings.
    fn check(&self, draft: &ContractDraft, findings: &mut RuleFindings);
}

/// Capability-enabled contracts must declare both an input and an output format.
#[derive(Debug, Default)]
pub struct CapabilitySchemaRule;

impl ContractRule for CapabilitySchemaRule {
    fn name(&self) -> &str {
        "capability-schema"
    }

    fn check(&self, draft: &ContractDraft, findings: &mut RuleFindings) {
        if !draft.capability_enabled() {
            return;
        }
        let schema = draft.invocation_schema();
        if schema.input().is_none() {
            findings.error(Violation::business(
                "ToolSchema.input",
                "capability-enabled contracts must define input parameters",
            ));
        }
        if schema.output_format().is_none() {
            findings.error(Violation::business(
                "ToolSchema.output.format",
                "capability-enabled contracts must define an output format",
            ));
        }
    }
}

/// Recursive and hybrid patterns are expected to carry a qualifying tag.
#[derive(Debug)]
pub struct RecursivePatternRule {
    tag: String,
    severity: RuleSeverity,
}

impl RecursivePatternRule {
    /// Creates the rule for the supplied tag and severity.
    #[must_use]
    pub fn new(tag: impl Into<String>, severity: RuleSeverity) -> Self {
        Self {
            tag: tag.into(),
            severity,
        }
    }
}

impl ContractRule for RecursivePatternRule {
    fn name(&self) -> &str {
        "recursive-pattern"
    }

    fn check(&self, draft: &ContractDraft, findings: &mut RuleFindings) {
        let Some(pattern) = draft.execution_pattern() else {
            return;
        };
        if pattern.is_recursive() && !draft.architectures().contains(&self.tag) {
            findings.report(
                self.severity,
                Violation::business(
                    fields::EXECUTION_PATTERN,
                    format!("{pattern} pattern typically requires {} architecture", self.tag),
                ),
            );
        }
    }
}

/// The quality score must lie in `[0, 1]`; out-of-range values are not clamped.
#[derive(Debug, Default)]
pub struct QualityScoreRule;

impl ContractRule for QualityScoreRule {
    fn name(&self) -> &str {
        "quality-score"
    }

    fn check(&self, draft: &ContractDraft, findings: &mut RuleFindings) {
        if let Some(score) = draft.quality_score() {
            if !(0.0..=1.0).contains(&score) {
                findings.error(Violation::business(
                    fields::QUALITY_SCORE,
                    format!("must be between 0 and 1, got {score}"),
                ));
            }
        }
    }
}

/// Capability-enabled contracts need a role to execute under.
#[derive(Debug, Default)]
pub struct CapabilityRoleRule;

impl ContractRule for CapabilityRoleRule {
    fn name(&self) -> &str {
        "capability-role"
    }

    fn check(&self, draft: &ContractDraft, findings: &mut RuleFindings) {
        if draft.capability_enabled() && draft.role().is_none() {
            findings.error(Violation::business(
                fields::ROLE,
                "capability-enabled contracts must declare an execution role",
            ));
        }
    }
}

/// Capability-enabled contracts are expected to carry the host architecture tag.
#[derive(Debug)]
pub struct CapabilityArchitectureRule {
    tag: String,
    severity: RuleSeverity,
}

impl CapabilityArchitectureRule {
    /// Creates the rule for the supplied tag and severity.
    #[must_use]
    pub fn new(tag: impl Into<String>, severity: RuleSeverity) -> Self {
        Self {
            tag: tag.into(),
            severity,
        }
    }
}

impl ContractRule for CapabilityArchitectureRule {
    fn name(&self) -> &str {
        "capability-architecture"
    }

    fn check(&self, draft: &ContractDraft, findings: &mut RuleFindings) {
        if draft.capability_enabled() && !draft.architectures().contains(&self.tag) {
            findings.report(
                self.severity,
                Violation::business(
                    fields::ARCHITECTURES,
                    format!("capability-enabled contracts should include {}", self.tag),
                ),
            );
        }
    }
}

/// Returns the built-in rule set for the supplied configuration.
#[must_use]
pub fn default_rules(config: &ValidatorConfig) -> Vec<Box<dyn ContractRule>> {
    vec![
        Box::new(CapabilitySchemaRule),
        Box::new(RecursivePatternRule::new(
            config.recursive_architecture_tag.clone(),
            config.recursive_pattern_severity,
        )),
        Box::new(QualityScoreRule),
        Box::new(CapabilityRoleRule),
        Box::new(CapabilityArchitectureRule::new(
            config.capability_architecture_tag.clone(),
            config.capability_architecture_severity,
        )),
    ]
}
