//! Binding table that exposes capabilities as named, invocable tools.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use agent_primitives::{AgentContract, ExecutionContext, ExecutionResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capability::{Capability, ToolDescriptor};
use crate::error::{RegistrationError, RegistrationResult, ToolError, ToolResult};

/// Executes one invocation against a contract.
///
/// Implemented by the dispatcher; each bound tool captures the contract it
/// delegates to.
#[async_trait]
pub trait ContractExecutor: Send + Sync {
    /// Runs `input` against `contract`.
    async fn execute(
        &self,
        contract: &AgentContract,
        input: Value,
        context: &ExecutionContext,
    ) -> ExecutionResult<String>;
}

/// One block of tool output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
}

/// Result of a tool call in protocol shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Output blocks.
    pub content: Vec<ContentBlock>,
    /// Set when the invocation failed.
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Failed invocation carrying the error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: message.into() }],
            is_error: true,
        }
    }

    /// Returns the concatenated text of all blocks.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|ContentBlock::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A bound tool: a capability plus the executor it delegates to.
#[derive(Clone)]
pub struct ToolHandle {
    capability: Arc<Capability>,
    executor: Arc<dyn ContractExecutor>,
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("tool", &self.capability.tool_name())
            .field("contract", &self.capability.contract_id())
            .finish_non_exhaustive()
    }
}

impl ToolHandle {
    /// Returns the bound capability.
    #[must_use]
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Runs the captured contract. Execution failures become error output.
    pub async fn invoke(&self, args: Value, context: &ExecutionContext) -> ToolOutput {
        let contract = self.capability.contract();
        debug!(tool = self.capability.tool_name(), contract = %contract.id(), trace = %context.trace_id(), "delegating tool call");
        match self.executor.execute(contract, args, context).await {
            Ok(text) => ToolOutput::text(text),
            Err(err) => {
                warn!(error = %err, trace = %context.trace_id(), "tool invocation failed");
                ToolOutput::error(format!("Error: {err}"))
            }
        }
    }
}

/// Immutable snapshot of all bindings produced by one registration pass.
pub type BindingTable = HashMap<String, ToolHandle>;

/// What a registration pass changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    /// Tool names bound by this pass, sorted.
    pub registered: Vec<String>,
    /// Tool names bound before and absent now, sorted.
    pub removed: Vec<String>,
    /// Generation number of the published table.
    pub generation: u64,
}

/// Registrar and lookup point for protocol-exposed tools.
///
/// Each successful [`register`](Self::register) call publishes a complete new
/// table; lookups taken before the swap keep the handles they captured.
pub struct ToolHost {
    executor: Arc<dyn ContractExecutor>,
    table: RwLock<Arc<BindingTable>>,
    generation: watch::Sender<u64>,
}

impl std::fmt::Debug for ToolHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.bindings().keys().cloned().collect();
        names.sort();
        f.debug_struct("ToolHost").field("registered", &names).finish()
    }
}

impl ToolHost {
    /// Creates an empty host delegating to `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn ContractExecutor>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            executor,
            table: RwLock::new(Arc::new(BindingTable::new())),
            generation,
        }
    }

    /// Binds every capability-enabled contract, replacing the previous table.
    ///
    /// Contracts with the flag off are skipped. On a tool name collision
    /// between distinct contract ids the pass aborts and the previous table
    /// stays in effect.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Conflict`] on a name collision and
    /// [`RegistrationError::InvalidCapability`] when a capability cannot be
    /// derived.
    pub fn register(&self, contracts: &[Arc<AgentContract>]) -> RegistrationResult<RegistrationSummary> {
        let mut next = BindingTable::new();

        for contract in contracts.iter().filter(|c| c.capability_enabled()) {
            let capability = Capability::from_contract(Arc::clone(contract))?;
            let name = capability.tool_name().to_owned();

            if let Some(existing) = next.get(&name) {
                let first = existing.capability.contract_id();
                if first != capability.contract_id() {
                    return Err(RegistrationError::Conflict {
                        tool_name: name,
                        first: first.clone(),
                        second: capability.contract_id().clone(),
                    });
                }
            }

            next.insert(
                name,
                ToolHandle {
                    capability: Arc::new(capability),
                    executor: Arc::clone(&self.executor),
                },
            );
        }

        let next = Arc::new(next);
        let previous = {
            let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };

        let mut registered: Vec<String> = next.keys().cloned().collect();
        registered.sort();
        let mut removed: Vec<String> = previous
            .keys()
            .filter(|name| !next.contains_key(*name))
            .cloned()
            .collect();
        removed.sort();

        let mut generation = 0;
        self.generation.send_modify(|value| {
            *value += 1;
            generation = *value;
        });

        info!(tools = registered.len(), removed = removed.len(), generation, "tool bindings published");
        Ok(RegistrationSummary {
            registered,
            removed,
            generation,
        })
    }

    /// Returns the current binding table.
    #[must_use]
    pub fn bindings(&self) -> Arc<BindingTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the handle bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ToolHandle> {
        self.bindings().get(name).cloned()
    }

    /// Lists the descriptors of all bound tools, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<_> = self
            .bindings()
            .values()
            .map(|handle| handle.capability.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Invokes the tool bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when nothing is bound under `name`.
    /// Execution failures are reported in the output, not as errors.
    pub async fn invoke(&self, name: &str, args: Value, context: &ExecutionContext) -> ToolResult<ToolOutput> {
        let handle = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })?;
        Ok(handle.invoke(args, context).await)
    }

    /// Subscribes to table generations; the value changes after every
    /// successful registration pass.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}
