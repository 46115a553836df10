//! Agent contract model and its closed enumerations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::ContractId;
use crate::schema::InvocationSchema;

/// Behaviour class of an agent.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    /// Provides deep domain expertise.
    Specialist,
    /// Carries out concrete units of work.
    Worker,
    /// Observes, analyses, and reports.
    Monitor,
    /// Coordinates other agents.
    Manager,
}

impl AgentRole {
    /// All roles in declaration order.
    pub const ALL: [Self; 4] = [Self::Specialist, Self::Worker, Self::Monitor, Self::Manager];

    /// Returns the wire label of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Specialist => "Specialist",
            Self::Worker => "Worker",
            Self::Monitor => "Monitor",
            Self::Manager => "Manager",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownVariant {
                field: "Role",
                value: s.to_owned(),
            })
    }
}

/// Ordered autonomy grade of an agent, from guided to self-improving.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum AutonomyLevel {
    /// Level 1: acts only under explicit guidance.
    Guided,
    /// Level 2: acts alone on routine work.
    SemiAutonomous,
    /// Level 3: acts alone.
    Autonomous,
    /// Level 4: acts alone and refines its own behaviour.
    SelfImproving,
}

impl AutonomyLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 4] = [
        Self::Guided,
        Self::SemiAutonomous,
        Self::Autonomous,
        Self::SelfImproving,
    ];

    /// Returns the numeric level, 1 through 4.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Guided => 1,
            Self::SemiAutonomous => 2,
            Self::Autonomous => 3,
            Self::SelfImproving => 4,
        }
    }

    /// Returns the full wire label, e.g. `Level 2 - Semi-Autonomous`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guided => "Level 1 - Guided",
            Self::SemiAutonomous => "Level 2 - Semi-Autonomous",
            Self::Autonomous => "Level 3 - Autonomous",
            Self::SelfImproving => "Level 4 - Self-Improving",
        }
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutonomyLevel {
    type Err = Error;

    /// Accepts the full label or the bare `Level N` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| {
                level.as_str() == trimmed || format!("Level {}", level.level()) == trimmed
            })
            .ok_or_else(|| Error::UnknownVariant {
                field: "AutonomyLevel",
                value: s.to_owned(),
            })
    }
}

/// Strategy an agent follows when decomposing work.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ExecutionPattern {
    /// One step after another.
    Sequential,
    /// Independent steps at once.
    Parallel,
    /// Self-similar decomposition.
    Recursive,
    /// Breadth-first exploration.
    #[serde(rename = "BFS")]
    Bfs,
    /// Mix of the above.
    Hybrid,
}

impl ExecutionPattern {
    /// All patterns in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Sequential,
        Self::Parallel,
        Self::Recursive,
        Self::Bfs,
        Self::Hybrid,
    ];

    /// Returns the wire label of the pattern.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "Sequential",
            Self::Parallel => "Parallel",
            Self::Recursive => "Recursive",
            Self::Bfs => "BFS",
            Self::Hybrid => "Hybrid",
        }
    }

    /// Returns `true` for patterns that recurse into sub-work.
    #[must_use]
    pub const fn is_recursive(self) -> bool {
        matches!(self, Self::Recursive | Self::Hybrid)
    }
}

impl fmt::Display for ExecutionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownVariant {
                field: "ExecutionPattern",
                value: s.to_owned(),
            })
    }
}

/// Operational status of a contract.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// Eligible for use.
    Active,
    /// Switched off.
    Inactive,
    /// Temporarily unavailable.
    Maintenance,
}

impl ContractStatus {
    /// All statuses in declaration order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Inactive, Self::Maintenance];

    /// Returns the wire label of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownVariant {
                field: "Status",
                value: s.to_owned(),
            })
    }
}

/// Declarative definition of one agent's identity, behaviour class, and
/// invocation shape.
///
/// Contracts are immutable once built. The `quality_score` range is enforced by
/// the validator rather than here, so an out-of-range score survives mapping
/// and is reported instead of clamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentContract {
    id: ContractId,
    name: String,
    role: AgentRole,
    category: String,
    autonomy_level: AutonomyLevel,
    execution_pattern: ExecutionPattern,
    capability_enabled: bool,
    invocation_schema: InvocationSchema,
    quality_score: f64,
    status: ContractStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    architectures: BTreeSet<String>,
}

impl AgentContract {
    /// Starts building a contract with the mandatory identity fields.
    #[must_use]
    pub fn builder(id: ContractId, name: impl Into<String>, role: AgentRole) -> AgentContractBuilder {
        AgentContractBuilder {
            id,
            name: name.into(),
            role,
            category: String::new(),
            autonomy_level: AutonomyLevel::Guided,
            execution_pattern: ExecutionPattern::Sequential,
            capability_enabled: false,
            invocation_schema: InvocationSchema::empty(),
            quality_score: 0.0,
            status: ContractStatus::Active,
            model_identifier: None,
            architectures: BTreeSet::new(),
        }
    }

    /// Returns the contract identifier.
    #[must_use]
    pub fn id(&self) -> &ContractId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the protocol-visible tool name derived from the display name.
    #[must_use]
    pub fn tool_name(&self) -> String {
        derive_tool_name(&self.name)
    }

    /// Returns the behaviour class.
    #[must_use]
    pub const fn role(&self) -> AgentRole {
        self.role
    }

    /// Returns the free-form category.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the autonomy grade.
    #[must_use]
    pub const fn autonomy_level(&self) -> AutonomyLevel {
        self.autonomy_level
    }

    /// Returns the execution pattern.
    #[must_use]
    pub const fn execution_pattern(&self) -> ExecutionPattern {
        self.execution_pattern
    }

    /// Returns `true` when the contract may be exposed over the protocol.
    #[must_use]
    pub const fn capability_enabled(&self) -> bool {
        self.capability_enabled
    }

    /// Returns the parsed invocation schema.
    #[must_use]
    pub fn invocation_schema(&self) -> &InvocationSchema {
        &self.invocation_schema
    }

    /// Returns the quality score.
    #[must_use]
    pub const fn quality_score(&self) -> f64 {
        self.quality_score
    }

    /// Returns the operational status.
    #[must_use]
    pub const fn status(&self) -> ContractStatus {
        self.status
    }

    /// Returns the backend model identifier, `None` meaning "use default".
    #[must_use]
    pub fn model_identifier(&self) -> Option<&str> {
        self.model_identifier.as_deref()
    }

    /// Returns the architecture and dependency tags.
    #[must_use]
    pub fn architectures(&self) -> &BTreeSet<String> {
        &self.architectures
    }

    /// Returns `true` when the contract carries the supplied architecture tag.
    #[must_use]
    pub fn has_architecture(&self, tag: &str) -> bool {
        self.architectures.contains(tag)
    }
}

/// Builder for [`AgentContract`].
#[derive(Debug)]
pub struct AgentContractBuilder {
    id: ContractId,
    name: String,
    role: AgentRole,
    category: String,
    autonomy_level: AutonomyLevel,
    execution_pattern: ExecutionPattern,
    capability_enabled: bool,
    invocation_schema: InvocationSchema,
    quality_score: f64,
    status: ContractStatus,
    model_identifier: Option<String>,
    architectures: BTreeSet<String>,
}

impl AgentContractBuilder {
    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the autonomy level.
    #[must_use]
    pub fn autonomy_level(mut self, level: AutonomyLevel) -> Self {
        self.autonomy_level = level;
        self
    }

    /// Sets the execution pattern.
    #[must_use]
    pub fn execution_pattern(mut self, pattern: ExecutionPattern) -> Self {
        self.execution_pattern = pattern;
        self
    }

    /// Enables or disables protocol exposure.
    #[must_use]
    pub fn capability_enabled(mut self, enabled: bool) -> Self {
        self.capability_enabled = enabled;
        self
    }

    /// Sets the invocation schema.
    #[must_use]
    pub fn invocation_schema(mut self, schema: InvocationSchema) -> Self {
        self.invocation_schema = schema;
        self
    }

    /// Sets the quality score. Range checks happen during validation.
    #[must_use]
    pub fn quality_score(mut self, score: f64) -> Self {
        self.quality_score = score;
        self
    }

    /// Sets the operational status.
    #[must_use]
    pub fn status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the backend model identifier. Empty values and `N/A` mean "default".
    #[must_use]
    pub fn model_identifier(mut self, model: impl Into<String>) -> Self {
        self.model_identifier = normalize_model_identifier(&model.into());
        self
    }

    /// Adds an architecture or dependency tag.
    #[must_use]
    pub fn architecture(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.trim().is_empty() {
            self.architectures.insert(tag.trim().to_owned());
        }
        self
    }

    /// Finalises the contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContract`] when the name is blank or the quality
    /// score is not a finite number.
    pub fn build(self) -> Result<AgentContract> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidContract {
                reason: "name cannot be empty".into(),
            });
        }
        if !self.quality_score.is_finite() {
            return Err(Error::InvalidContract {
                reason: "quality score must be a finite number".into(),
            });
        }

        Ok(AgentContract {
            id: self.id,
            name: self.name,
            role: self.role,
            category: self.category,
            autonomy_level: self.autonomy_level,
            execution_pattern: self.execution_pattern,
            capability_enabled: self.capability_enabled,
            invocation_schema: self.invocation_schema,
            quality_score: self.quality_score,
            status: self.status,
            model_identifier: self.model_identifier,
            architectures: self.architectures,
        })
    }
}

/// Derives the protocol-visible tool name: lower-cased, with every run of
/// whitespace replaced by a single underscore.
#[must_use]
pub fn derive_tool_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Trims a model identifier; empty values and `N/A` (any case) yield `None`,
/// meaning "use the host default".
#[must_use]
pub fn normalize_model_identifier(model: &str) -> Option<String> {
    let trimmed = model.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_name_collapses_whitespace() {
        assert_eq!(derive_tool_name("Market  Research\tAgent"), "market_research_agent");
        assert_eq!(derive_tool_name(" Solo "), "solo");
    }

    #[test]
    fn autonomy_accepts_short_label() {
        assert_eq!(
            "Level 3".parse::<AutonomyLevel>().unwrap(),
            AutonomyLevel::Autonomous
        );
        assert_eq!(
            "Level 2 - Semi-Autonomous".parse::<AutonomyLevel>().unwrap(),
            AutonomyLevel::SemiAutonomous
        );
        assert!("Level 5".parse::<AutonomyLevel>().is_err());
        assert!(AutonomyLevel::Guided < AutonomyLevel::SelfImproving);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "Overlord".parse::<AgentRole>().expect_err("unknown role");
        assert!(matches!(err, Error::UnknownVariant { field: "Role", .. }));
    }

    #[test]
    fn sentinel_model_means_default() {
        let contract = AgentContract::builder(
            ContractId::new("a-1").unwrap(),
            "Analyst",
            AgentRole::Monitor,
        )
        .model_identifier("N/A")
        .build()
        .unwrap();
        assert_eq!(contract.model_identifier(), None);
    }

    #[test]
    fn builder_rejects_blank_name() {
        let err = AgentContract::builder(ContractId::new("a-1").unwrap(), " ", AgentRole::Worker)
            .build()
            .expect_err("blank name");
        assert!(matches!(err, Error::InvalidContract { .. }));
    }
}
