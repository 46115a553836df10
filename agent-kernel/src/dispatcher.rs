//! Executes capability invocations against generation backends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agent_adapters::{GenerationConfig, GenerationRequest};
use agent_primitives::{AgentContract, ExecutionContext, ExecutionError, ExecutionResult};
use agent_prompts::build_instructions;
use agent_tools::ContractExecutor;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::client_cache::ModelClientCache;
use crate::invocation::{InvocationEvent, InvocationTracker};

/// Returned when the backend answered without any text.
pub const NO_RESPONSE: &str = "No response generated.";

/// Dispatcher settings fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatcherConfig {
    /// Upper bound on one backend call.
    pub invocation_timeout: Duration,
    /// Sampling settings sent with every call.
    pub generation: GenerationConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            invocation_timeout: Duration::from_secs(60),
            generation: GenerationConfig::default(),
        }
    }
}

/// Routes invocations to the backend client of each contract's model.
///
/// Invocations share nothing but the client cache; no retries are made.
pub struct Dispatcher {
    clients: Arc<ModelClientCache>,
    config: DispatcherConfig,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("clients", &self.clients)
            .field("config", &self.config)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher using `clients`.
    #[must_use]
    pub fn new(clients: Arc<ModelClientCache>, config: DispatcherConfig) -> Self {
        Self { clients, config }
    }

    /// Returns the client cache.
    #[must_use]
    pub fn clients(&self) -> &Arc<ModelClientCache> {
        &self.clients
    }

    /// Executes `input` against `contract` with a fresh context.
    ///
    /// # Errors
    ///
    /// See [`execute_with_context`](Self::execute_with_context).
    pub async fn execute(&self, contract: &AgentContract, input: Value) -> ExecutionResult<String> {
        self.execute_with_context(contract, input, &ExecutionContext::new())
            .await
    }

    /// Executes `input` against `contract`.
    ///
    /// Context window fragments precede the task as earlier user turns. A
    /// backend that answers with no text yields [`NO_RESPONSE`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when no client can be resolved, when the
    /// backend call fails, or when it exceeds the configured timeout.
    pub async fn execute_with_context(
        &self,
        contract: &AgentContract,
        input: Value,
        context: &ExecutionContext,
    ) -> ExecutionResult<String> {
        let mut tracker = InvocationTracker::new(context.trace_id(), contract.id().clone());
        let result = self.run(&mut tracker, contract, &input, context).await;

        match &result {
            Ok(text) => {
                advance(&mut tracker, InvocationEvent::Complete);
                info!(
                    contract_id = %contract.id(),
                    trace_id = %context.trace_id(),
                    priority = ?context.priority(),
                    chars = text.len(),
                    "invocation succeeded"
                );
            }
            Err(err) => {
                advance(&mut tracker, InvocationEvent::Fail);
                warn!(trace_id = %context.trace_id(), error = %err, "invocation failed");
            }
        }
        result
    }

    async fn run(
        &self,
        tracker: &mut InvocationTracker,
        contract: &AgentContract,
        input: &Value,
        context: &ExecutionContext,
    ) -> ExecutionResult<String> {
        let id = contract.id();
        let client = self
            .clients
            .resolve(contract.model_identifier())
            .map_err(|err| ExecutionError::model_unavailable(id.clone(), err.to_string()))?;
        advance(tracker, InvocationEvent::ModelResolved);

        let instructions = build_instructions(contract, input)
            .map_err(|err| ExecutionError::backend(id.clone(), err.to_string()))?;
        let request = GenerationRequest::new(instructions.system_text, instructions.task_text)
            .with_prior_turns(context.context_window().to_vec())
            .with_config(self.config.generation);

        let timeout = self.config.invocation_timeout;
        let generated = tokio::time::timeout(timeout, client.generate(&request))
            .await
            .map_err(|_| ExecutionError::timeout(id.clone(), timeout))?
            .map_err(|err| ExecutionError::backend(id.clone(), err.to_string()))?;

        Ok(match generated {
            Some(text) if !text.trim().is_empty() => text,
            _ => NO_RESPONSE.to_owned(),
        })
    }
}

fn advance(tracker: &mut InvocationTracker, event: InvocationEvent) {
    if let Err(err) = tracker.transition(event) {
        warn!(error = %err, "unexpected invocation transition");
    }
}

#[async_trait]
impl ContractExecutor for Dispatcher {
    async fn execute(
        &self,
        contract: &AgentContract,
        input: Value,
        context: &ExecutionContext,
    ) -> ExecutionResult<String> {
        self.execute_with_context(contract, input, context).await
    }
}
