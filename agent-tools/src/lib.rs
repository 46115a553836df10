//! Capability registration for protocol-exposed tools.
//!
//! [`Capability::from_contract`] turns an enabled contract into a tool
//! description; [`ToolHost`] binds those capabilities to an executor and
//! publishes them as one atomically swapped table.

#![warn(missing_docs, clippy::pedantic)]

pub mod capability;
pub mod error;
pub mod registry;

pub use capability::{Capability, CapabilitySpec, ToolDescriptor};
pub use error::{RegistrationError, RegistrationResult, ToolError, ToolResult};
pub use registry::{
    BindingTable, ContentBlock, ContractExecutor, RegistrationSummary, ToolHandle, ToolHost, ToolOutput,
};
