//! Runtime core for contract-backed agents.
//!
//! The [`ContractRegistry`] pulls raw records from a [`ContractSource`] and
//! publishes the validated, active set as a snapshot. The [`Dispatcher`]
//! executes capability invocations against generation backends held in a
//! [`ModelClientCache`], and the [`McpServer`] exposes the bound tools over
//! newline-delimited JSON-RPC.

#![warn(missing_docs, clippy::pedantic)]

mod client_cache;
mod dispatcher;
mod invocation;
pub mod jsonrpc;
mod mcp_server;
mod registry;
mod scheduler;
mod source;

pub use client_cache::{DEFAULT_MODEL, GeminiClientFactory, ModelClientCache, ModelClientFactory};
pub use dispatcher::{Dispatcher, DispatcherConfig, NO_RESPONSE};
pub use invocation::{InvocationError, InvocationEvent, InvocationResult, InvocationState, InvocationTracker};
pub use mcp_server::{McpServer, PROTOCOL_VERSION, ServerError, ServerInfo, ServerResult, TOOLS_LIST_CHANGED};
pub use registry::{ContractRegistry, RegistryError, RegistryResult, RegistrySnapshot};
pub use scheduler::{DEFAULT_MAX_QUEUED, InvocationScheduler, SchedulerConfig, SchedulerError, SchedulerResult};
pub use source::{ContractFilter, ContractSource, InMemorySource, JsonFileSource, RecordPage, records_from_value};
