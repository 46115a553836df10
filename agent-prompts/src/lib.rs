//! Instruction building for contract-backed capabilities.

#![warn(missing_docs, clippy::pedantic)]

pub mod preamble;
pub mod template;

pub use preamble::{InstructionPayload, build_instructions, role_mission, system_preamble, task_payload};
pub use template::{PromptTemplate, TemplateError, TemplateResult};
