//! Generation backends used by the dispatcher.
//!
//! [`traits`] defines the backend-neutral request and client interface;
//! [`gemini`] implements it over HTTPS.

#![warn(missing_docs, clippy::pedantic)]

pub mod gemini;
pub mod traits;

mod http_client;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use traits::{AdapterError, AdapterResult, GenerationBackend, GenerationConfig, GenerationRequest};
