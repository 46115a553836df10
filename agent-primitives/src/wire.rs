//! Flat key/value wire shape of agent contracts.
//!
//! Data sources surface contracts as property bags keyed by the names in
//! [`fields`]. [`ContractDraft::from_record`] performs the structural part of
//! validation: it reads every field it can and reports every field it cannot,
//! without short-circuiting.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::{
    AgentContract, AgentRole, AutonomyLevel, ContractStatus, ExecutionPattern,
    normalize_model_identifier,
};
use crate::ids::ContractId;
use crate::schema::InvocationSchema;
use crate::violation::Violation;

/// Wire keys of a contract record.
pub mod fields {
    /// Contract identifier.
    pub const AGENT_ID: &str = "AgentID";
    /// Display name.
    pub const NAME: &str = "Name";
    /// Behaviour class.
    pub const ROLE: &str = "Role";
    /// Free-form category.
    pub const CATEGORY: &str = "Category";
    /// Autonomy grade.
    pub const AUTONOMY_LEVEL: &str = "AutonomyLevel";
    /// Execution pattern.
    pub const EXECUTION_PATTERN: &str = "ExecutionPattern";
    /// Protocol exposure flag.
    pub const MCP_ENABLED: &str = "MCPEnabled";
    /// Alternative spelling of [`MCP_ENABLED`].
    pub const CAPABILITY_ENABLED: &str = "capabilityEnabled";
    /// String-encoded invocation schema.
    pub const TOOL_SCHEMA: &str = "ToolSchema";
    /// Quality score in `[0, 1]`.
    pub const QUALITY_SCORE: &str = "QualityScore";
    /// Operational status.
    pub const STATUS: &str = "Status";
    /// Backend model identifier.
    pub const MODEL: &str = "Model";
    /// Alternative spelling of [`MODEL`].
    pub const VERTEX_AI_MODEL: &str = "VertexAIModel";
    /// Architecture and dependency tags.
    pub const ARCHITECTURES: &str = "Architectures";
}

/// Opaque property bag as returned by a data source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractRecord(BTreeMap<String, Value>);

impl ContractRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a decoded JSON value into a record; only objects qualify.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            _ => None,
        }
    }

    /// Inserts a property, returning the updated record.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a property.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns a property, treating JSON `null` as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// Returns the contract identifier as text, when present.
    #[must_use]
    pub fn agent_id(&self) -> Option<&str> {
        self.get(fields::AGENT_ID).and_then(Value::as_str)
    }

    /// Iterates over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl AgentContract {
    /// Serialises the contract into its flat wire shape.
    #[must_use]
    pub fn to_record(&self) -> ContractRecord {
        let mut record = ContractRecord::new()
            .with(fields::AGENT_ID, self.id().as_str())
            .with(fields::NAME, self.name())
            .with(fields::ROLE, self.role().as_str())
            .with(fields::CATEGORY, self.category())
            .with(fields::AUTONOMY_LEVEL, self.autonomy_level().as_str())
            .with(fields::EXECUTION_PATTERN, self.execution_pattern().as_str())
            .with(fields::MCP_ENABLED, self.capability_enabled())
            .with(fields::TOOL_SCHEMA, self.invocation_schema().to_wire_string())
            .with(fields::QUALITY_SCORE, self.quality_score())
            .with(fields::STATUS, self.status().as_str());

        if let Some(model) = self.model_identifier() {
            record.insert(fields::MODEL, model);
        }
        if !self.architectures().is_empty() {
            let tags: Vec<Value> = self.architectures().iter().map(|t| Value::from(t.as_str())).collect();
            record.insert(fields::ARCHITECTURES, Value::Array(tags));
        }
        record
    }
}

/// Partially parsed contract: every field that could be read from a record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractDraft {
    id: Option<ContractId>,
    name: Option<String>,
    role: Option<AgentRole>,
    category: Option<String>,
    autonomy_level: Option<AutonomyLevel>,
    execution_pattern: Option<ExecutionPattern>,
    capability_enabled: bool,
    invocation_schema: InvocationSchema,
    quality_score: Option<f64>,
    status: Option<ContractStatus>,
    model_identifier: Option<String>,
    architectures: BTreeSet<String>,
}

impl ContractDraft {
    /// Reads a record, returning the draft and every structural violation.
    ///
    /// Missing or mistyped required fields and unknown enumeration values are
    /// reported, never defaulted. The invocation schema never fails: text that
    /// does not parse becomes the empty schema. An absent capability flag reads
    /// as disabled.
    #[must_use]
    pub fn from_record(record: &ContractRecord) -> (Self, Vec<Violation>) {
        let mut violations = Vec::new();
        let mut draft = Self::default();

        draft.id = required_str(record, fields::AGENT_ID, &mut violations).and_then(|raw| {
            ContractId::new(raw)
                .map_err(|err| violations.push(Violation::schema(fields::AGENT_ID, err.to_string())))
                .ok()
        });
        draft.name = required_str(record, fields::NAME, &mut violations).and_then(|raw| {
            if raw.trim().is_empty() {
                violations.push(Violation::schema(fields::NAME, "must not be empty"));
                None
            } else {
                Some(raw.to_owned())
            }
        });
        draft.role = required_enum(record, fields::ROLE, &mut violations);
        draft.category = required_str(record, fields::CATEGORY, &mut violations).map(str::to_owned);
        draft.autonomy_level = required_enum(record, fields::AUTONOMY_LEVEL, &mut violations);
        draft.execution_pattern = required_enum(record, fields::EXECUTION_PATTERN, &mut violations);
        draft.status = required_enum(record, fields::STATUS, &mut violations);
        draft.capability_enabled = read_flag(record, &mut violations);
        draft.invocation_schema = read_schema(record);
        draft.quality_score = match record.get(fields::QUALITY_SCORE) {
            None => {
                violations.push(Violation::schema(fields::QUALITY_SCORE, "is required"));
                None
            }
            Some(value) => value.as_f64().or_else(|| {
                violations.push(Violation::schema(fields::QUALITY_SCORE, "must be a number"));
                None
            }),
        };
        draft.model_identifier = read_model(record, &mut violations);
        draft.architectures = read_architectures(record, &mut violations);

        (draft, violations)
    }

    /// Returns the identifier, if it was readable.
    #[must_use]
    pub fn id(&self) -> Option<&ContractId> {
        self.id.as_ref()
    }

    /// Returns the display name, if it was readable.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the role, if it was readable.
    #[must_use]
    pub const fn role(&self) -> Option<AgentRole> {
        self.role
    }

    /// Returns the execution pattern, if it was readable.
    #[must_use]
    pub const fn execution_pattern(&self) -> Option<ExecutionPattern> {
        self.execution_pattern
    }

    /// Returns the capability flag.
    #[must_use]
    pub const fn capability_enabled(&self) -> bool {
        self.capability_enabled
    }

    /// Returns the parsed invocation schema.
    #[must_use]
    pub fn invocation_schema(&self) -> &InvocationSchema {
        &self.invocation_schema
    }

    /// Returns the quality score, if it was readable.
    #[must_use]
    pub const fn quality_score(&self) -> Option<f64> {
        self.quality_score
    }

    /// Returns the status, if it was readable.
    #[must_use]
    pub const fn status(&self) -> Option<ContractStatus> {
        self.status
    }

    /// Returns the architecture tags.
    #[must_use]
    pub fn architectures(&self) -> &BTreeSet<String> {
        &self.architectures
    }

    /// Assembles the contract when every required field was readable.
    #[must_use]
    pub fn into_contract(self) -> Option<AgentContract> {
        let mut builder = AgentContract::builder(self.id?, self.name?, self.role?)
            .category(self.category?)
            .autonomy_level(self.autonomy_level?)
            .execution_pattern(self.execution_pattern?)
            .capability_enabled(self.capability_enabled)
            .invocation_schema(self.invocation_schema)
            .quality_score(self.quality_score?)
            .status(self.status?);
        if let Some(model) = self.model_identifier {
            builder = builder.model_identifier(model);
        }
        for tag in self.architectures {
            builder = builder.architecture(tag);
        }
        builder.build().ok()
    }
}

fn required_str<'a>(
    record: &'a ContractRecord,
    key: &'static str,
    violations: &mut Vec<Violation>,
) -> Option<&'a str> {
    match record.get(key) {
        None => {
            violations.push(Violation::schema(key, "is required"));
            None
        }
        Some(Value::String(text)) => Some(text.as_str()),
        Some(_) => {
            violations.push(Violation::schema(key, "must be a string"));
            None
        }
    }
}

fn required_enum<T>(record: &ContractRecord, key: &'static str, violations: &mut Vec<Violation>) -> Option<T>
where
    T: std::str::FromStr<Err = crate::Error>,
{
    let raw = required_str(record, key, violations)?;
    raw.parse::<T>()
        .map_err(|err| violations.push(Violation::schema(key, err.to_string())))
        .ok()
}

fn read_flag(record: &ContractRecord, violations: &mut Vec<Violation>) -> bool {
    let (key, value) = match record.get(fields::MCP_ENABLED) {
        Some(value) => (fields::MCP_ENABLED, value),
        None => match record.get(fields::CAPABILITY_ENABLED) {
            Some(value) => (fields::CAPABILITY_ENABLED, value),
            None => return false,
        },
    };

    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "__yes__" | "true" | "yes" => true,
            "__no__" | "false" | "no" | "" => false,
            _ => {
                violations.push(Violation::schema(key, format!("unknown flag value `{text}`")));
                false
            }
        },
        _ => {
            violations.push(Violation::schema(key, "must be a boolean"));
            false
        }
    }
}

fn read_schema(record: &ContractRecord) -> InvocationSchema {
    match record.get(fields::TOOL_SCHEMA) {
        Some(Value::String(text)) => InvocationSchema::parse(text),
        Some(value @ Value::Object(_)) => InvocationSchema::from_value(value.clone()),
        _ => InvocationSchema::empty(),
    }
}

fn read_model(record: &ContractRecord, violations: &mut Vec<Violation>) -> Option<String> {
    let (key, value) = match record.get(fields::MODEL) {
        Some(value) => (fields::MODEL, value),
        None => (fields::VERTEX_AI_MODEL, record.get(fields::VERTEX_AI_MODEL)?),
    };
    if let Some(text) = value.as_str() {
        normalize_model_identifier(text)
    } else {
        violations.push(Violation::schema(key, "must be a string"));
        None
    }
}

fn read_architectures(record: &ContractRecord, violations: &mut Vec<Violation>) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    match record.get(fields::ARCHITECTURES) {
        None => {}
        Some(Value::String(text)) => {
            tags.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned),
            );
        }
        Some(Value::Array(items)) => {
            for item in items {
                match item.as_str().map(str::trim) {
                    Some(tag) if !tag.is_empty() => {
                        tags.insert(tag.to_owned());
                    }
                    Some(_) => {}
                    None => violations.push(Violation::schema(
                        fields::ARCHITECTURES,
                        "entries must be strings",
                    )),
                }
            }
        }
        Some(_) => violations.push(Violation::schema(
            fields::ARCHITECTURES,
            "must be a list of strings",
        )),
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::ViolationKind;
    use serde_json::json;

    fn record() -> ContractRecord {
        ContractRecord::from_value(json!({
            "AgentID": "agent-001",
            "Name": "Market Analyst",
            "Role": "Specialist",
            "Category": "Knowledge",
            "AutonomyLevel": "Level 3 - Autonomous",
            "ExecutionPattern": "Hybrid",
            "MCPEnabled": "__YES__",
            "ToolSchema": "{\"input\":{\"parameters\":{\"q\":{\"type\":\"string\"}}},\"output\":{\"format\":\"json\"}}",
            "QualityScore": 0.92,
            "Status": "Active",
            "VertexAIModel": "gemini-1.5-flash",
            "Architectures": "RCOP, MCP-Swarm"
        }))
        .unwrap()
    }

    #[test]
    fn reads_a_complete_record() {
        let (draft, violations) = ContractDraft::from_record(&record());
        assert!(violations.is_empty(), "{violations:?}");

        let contract = draft.into_contract().expect("contract");
        assert_eq!(contract.id().as_str(), "agent-001");
        assert!(contract.capability_enabled());
        assert_eq!(contract.model_identifier(), Some("gemini-1.5-flash"));
        assert!(contract.has_architecture("RCOP"));
        assert_eq!(contract.invocation_schema().output_format(), Some("json"));
    }

    #[test]
    fn reports_every_structural_problem() {
        let mut bad = record();
        bad.remove(fields::NAME);
        bad.insert(fields::ROLE, "Overlord");
        bad.insert(fields::QUALITY_SCORE, "high");

        let (draft, violations) = ContractDraft::from_record(&bad);
        let paths: Vec<_> = violations.iter().map(Violation::path).collect();
        assert_eq!(paths, vec!["Name", "Role", "QualityScore"]);
        assert!(violations.iter().all(|v| v.kind() == ViolationKind::Schema));
        assert!(draft.into_contract().is_none());
    }

    #[test]
    fn out_of_range_score_is_not_a_structural_error() {
        let mut rec = record();
        rec.insert(fields::QUALITY_SCORE, 1.5);
        let (draft, violations) = ContractDraft::from_record(&rec);
        assert!(violations.is_empty());
        assert_eq!(draft.quality_score(), Some(1.5));
    }

    #[test]
    fn malformed_schema_degrades_to_empty() {
        let mut rec = record();
        rec.insert(fields::TOOL_SCHEMA, "{broken");
        let (draft, violations) = ContractDraft::from_record(&rec);
        assert!(violations.is_empty());
        assert!(draft.invocation_schema().is_empty());
    }

    #[test]
    fn wire_round_trip_preserves_every_field() {
        let (draft, _) = ContractDraft::from_record(&record());
        let contract = draft.into_contract().unwrap();

        let (again, violations) = ContractDraft::from_record(&contract.to_record());
        assert!(violations.is_empty());
        assert_eq!(again.into_contract().unwrap(), contract);
    }
}
