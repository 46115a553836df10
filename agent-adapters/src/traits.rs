//! Backend-neutral generation interface.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by generation backends.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type shared by backend implementations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Backend is misconfigured or missing credentials.
    #[error("backend not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The request could not be encoded for the backend.
    #[error("invalid generation request: {reason}")]
    InvalidRequest {
        /// Reason the request was refused.
        reason: String,
    },

    /// Network or protocol failure.
    #[error("backend transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The backend rejected the request due to quota or rate limiting.
    #[error("backend rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The backend answered with an error status or an unreadable body.
    #[error("backend response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Sampling settings applied to every generation call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    /// Sampling temperature; low values keep output close to the schema.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }
}

/// One generation call: a system preamble, optional prior turns, and the task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    system_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    prior_turns: Vec<String>,
    task_text: String,
    config: GenerationConfig,
}

impl GenerationRequest {
    /// Creates a request with the default generation settings.
    #[must_use]
    pub fn new(system_text: impl Into<String>, task_text: impl Into<String>) -> Self {
        Self {
            system_text: system_text.into(),
            prior_turns: Vec::new(),
            task_text: task_text.into(),
            config: GenerationConfig::default(),
        }
    }

    /// Prepends caller-supplied context fragments, sent as earlier user turns.
    #[must_use]
    pub fn with_prior_turns(mut self, turns: Vec<String>) -> Self {
        self.prior_turns = turns;
        self
    }

    /// Overrides the generation settings.
    #[must_use]
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the system preamble.
    #[must_use]
    pub fn system_text(&self) -> &str {
        &self.system_text
    }

    /// Returns the prior context fragments.
    #[must_use]
    pub fn prior_turns(&self) -> &[String] {
        &self.prior_turns
    }

    /// Returns the task payload.
    #[must_use]
    pub fn task_text(&self) -> &str {
        &self.task_text
    }

    /// Returns the generation settings.
    #[must_use]
    pub const fn config(&self) -> GenerationConfig {
        self.config
    }
}

/// A client bound to one backend model.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the provider name, e.g. `gemini`.
    fn provider(&self) -> &'static str;

    /// Returns the model identifier the client is bound to.
    fn model(&self) -> &str;

    /// Generates text for the request.
    ///
    /// `Ok(None)` means the backend answered but produced no text.
    async fn generate(&self, request: &GenerationRequest) -> AdapterResult<Option<String>>;
}
