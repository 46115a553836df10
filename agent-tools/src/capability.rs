//! Capabilities derived from validated contracts.

use std::sync::Arc;

use agent_primitives::{AgentContract, AgentRole, ContractId};
use serde::Serialize;
use serde_json::Value;

use crate::error::{RegistrationError, RegistrationResult};

/// Protocol-facing description of a capability.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name derived from the contract name.
    pub name: String,
    /// Human-readable summary.
    pub description: String,
    /// JSON Schema of the accepted arguments.
    pub input_schema: Value,
}

/// An invocable unit derived from one enabled contract, tagged by role.
#[derive(Clone, Debug, PartialEq)]
pub enum Capability {
    /// Domain expertise within a category.
    Specialist(CapabilitySpec),
    /// Task execution.
    Worker(CapabilitySpec),
    /// Analysis and reporting.
    Monitor(CapabilitySpec),
    /// Planning and coordination.
    Manager(CapabilitySpec),
}

/// Data shared by every capability variant.
#[derive(Clone, Debug, PartialEq)]
pub struct CapabilitySpec {
    contract: Arc<AgentContract>,
    descriptor: ToolDescriptor,
}

impl Capability {
    /// Builds the capability for a contract.
    ///
    /// This is a pure transformation; nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::NotExposed`] for contracts whose capability
    /// flag is off and [`RegistrationError::InvalidCapability`] when no tool
    /// name can be derived.
    pub fn from_contract(contract: Arc<AgentContract>) -> RegistrationResult<Self> {
        if !contract.capability_enabled() {
            return Err(RegistrationError::NotExposed {
                id: contract.id().clone(),
            });
        }

        let name = contract.tool_name();
        if name.is_empty() {
            return Err(RegistrationError::InvalidCapability {
                id: contract.id().clone(),
                reason: "tool name derived from contract name is empty".into(),
            });
        }

        let descriptor = ToolDescriptor {
            description: describe(&contract),
            input_schema: contract.invocation_schema().input_schema(),
            name,
        };
        let role = contract.role();
        let spec = CapabilitySpec { contract, descriptor };

        Ok(match role {
            AgentRole::Specialist => Self::Specialist(spec),
            AgentRole::Worker => Self::Worker(spec),
            AgentRole::Monitor => Self::Monitor(spec),
            AgentRole::Manager => Self::Manager(spec),
        })
    }

    fn spec(&self) -> &CapabilitySpec {
        match self {
            Self::Specialist(spec) | Self::Worker(spec) | Self::Monitor(spec) | Self::Manager(spec) => spec,
        }
    }

    /// Returns the backing contract.
    #[must_use]
    pub fn contract(&self) -> &Arc<AgentContract> {
        &self.spec().contract
    }

    /// Returns the backing contract id.
    #[must_use]
    pub fn contract_id(&self) -> &ContractId {
        self.spec().contract.id()
    }

    /// Returns the protocol tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.spec().descriptor.name
    }

    /// Returns the protocol descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.spec().descriptor
    }
}

fn describe(contract: &AgentContract) -> String {
    let mut text = format!("{} ({}", contract.name(), contract.role());
    if !contract.category().is_empty() {
        text.push_str(", ");
        text.push_str(contract.category());
    }
    text.push(')');
    if let Some(format) = contract.invocation_schema().output_format() {
        text.push_str(&format!(". Returns {format}."));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::InvocationSchema;

    fn contract(role: AgentRole, enabled: bool) -> Arc<AgentContract> {
        Arc::new(
            AgentContract::builder(ContractId::new("agent-9").unwrap(), "Deep Research Lead", role)
                .category("Research")
                .capability_enabled(enabled)
                .invocation_schema(InvocationSchema::parse(
                    r#"{"input":{"topic":{"type":"string"}},"output":{"format":"markdown"}}"#,
                ))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn variant_follows_role() {
        let capability = Capability::from_contract(contract(AgentRole::Manager, true)).unwrap();
        assert!(matches!(capability, Capability::Manager(_)));
        assert_eq!(capability.tool_name(), "deep_research_lead");
        assert_eq!(capability.contract_id().as_str(), "agent-9");
    }

    #[test]
    fn descriptor_exposes_input_schema() {
        let capability = Capability::from_contract(contract(AgentRole::Monitor, true)).unwrap();
        let descriptor = capability.descriptor();
        assert_eq!(descriptor.input_schema["properties"]["topic"]["type"], "string");
        assert_eq!(descriptor.description, "Deep Research Lead (Monitor, Research). Returns markdown.");
    }

    #[test]
    fn disabled_contract_is_not_exposed() {
        let err = Capability::from_contract(contract(AgentRole::Worker, false)).unwrap_err();
        assert!(matches!(err, RegistrationError::NotExposed { .. }));
    }
}
