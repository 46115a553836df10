//! Instruction payloads built from agent contracts.
//!
//! The preamble is a pure function of the contract: same contract, same text.

use std::collections::BTreeMap;

use agent_primitives::{AgentContract, AgentRole};
use serde_json::Value;

use crate::template::{PromptTemplate, TemplateResult};

const PREAMBLE: PromptTemplate = PromptTemplate::new(
    "YOU ARE AGENT: {{name}} (ID: {{id}})
ROLE: {{role}}
CATEGORY: {{category}}
AUTONOMY: {{autonomy}}
EXECUTION PATTERN: {{pattern}}

YOUR CORE SKILLS: {{skills}}

MISSION:
{{mission}}
Execute tasks strictly according to your defined schema.

OUTPUT FORMAT:
{{output}}",
);

/// Prefix marking the caller-supplied task payload.
pub const TASK_PREFIX: &str = "TASK_INPUT: ";

/// The two-part instruction payload sent to a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionPayload {
    /// System preamble describing the agent.
    pub system_text: String,
    /// Serialised task input.
    pub task_text: String,
}

/// Returns the behavioural mission for a role.
#[must_use]
pub const fn role_mission(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Specialist => "Provide deep domain expertise within your category.",
        AgentRole::Worker => "Carry out the requested task completely and report what was done.",
        AgentRole::Monitor => "Analyse the supplied input and report findings, risks, and anomalies.",
        AgentRole::Manager => "Break the request into steps, decide priorities, and summarise the plan.",
    }
}

/// Builds the system preamble for a contract.
///
/// # Errors
///
/// Returns a template error only if the built-in template is inconsistent.
pub fn system_preamble(contract: &AgentContract) -> TemplateResult<String> {
    let schema = contract.invocation_schema();
    let output = match schema.output_format() {
        Some(format) => format!("Return the result as {format}."),
        None => "Return clear, structured JSON data whenever possible.".to_owned(),
    };

    let vars = BTreeMap::from([
        ("name", contract.name().to_owned()),
        ("id", contract.id().to_string()),
        ("role", contract.role().to_string()),
        ("category", contract.category().to_owned()),
        ("autonomy", contract.autonomy_level().to_string()),
        ("pattern", contract.execution_pattern().to_string()),
        ("skills", schema.to_wire_string()),
        ("mission", role_mission(contract.role()).to_owned()),
        ("output", output),
    ]);
    PREAMBLE.render(&vars)
}

/// Serialises caller input as the task payload.
#[must_use]
pub fn task_payload(input: &Value) -> String {
    format!("{TASK_PREFIX}{input}")
}

/// Builds the full instruction payload for one invocation.
///
/// # Errors
///
/// Propagates [`system_preamble`] failures.
pub fn build_instructions(contract: &AgentContract, input: &Value) -> TemplateResult<InstructionPayload> {
    Ok(InstructionPayload {
        system_text: system_preamble(contract)?,
        task_text: task_payload(input),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::{AutonomyLevel, ContractId, InvocationSchema};
    use serde_json::json;

    fn contract(role: AgentRole) -> AgentContract {
        AgentContract::builder(ContractId::new("agent-7").unwrap(), "Risk Watch", role)
            .category("Finance")
            .autonomy_level(AutonomyLevel::Autonomous)
            .invocation_schema(InvocationSchema::parse(
                r#"{"input":{"ticker":{"type":"string"}},"output":{"format":"markdown"}}"#,
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn preamble_describes_the_contract() {
        let text = system_preamble(&contract(AgentRole::Monitor)).unwrap();
        assert!(text.starts_with("YOU ARE AGENT: Risk Watch (ID: agent-7)"));
        assert!(text.contains("ROLE: Monitor"));
        assert!(text.contains("CATEGORY: Finance"));
        assert!(text.contains("AUTONOMY: Level 3 - Autonomous"));
        assert!(text.contains("\"ticker\""));
        assert!(text.contains(role_mission(AgentRole::Monitor)));
        assert!(text.contains("Return the result as markdown."));
    }

    #[test]
    fn preamble_is_deterministic() {
        let a = system_preamble(&contract(AgentRole::Specialist)).unwrap();
        let b = system_preamble(&contract(AgentRole::Specialist)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, system_preamble(&contract(AgentRole::Worker)).unwrap());
    }

    #[test]
    fn task_payload_serialises_input() {
        let payload = build_instructions(&contract(AgentRole::Worker), &json!({"ticker": "ACME"})).unwrap();
        assert_eq!(payload.task_text, r#"TASK_INPUT: {"ticker":"ACME"}"#);
    }
}
