//! Strongly typed configuration sections.

use std::path::PathBuf;
use std::time::Duration;

use agent_adapters::gemini::DEFAULT_BASE_URL;
use agent_adapters::{AdapterResult, GeminiConfig, GenerationConfig};
use agent_telemetry::TelemetryConfig;
use agent_validator::ValidatorConfig;
use serde::{Deserialize, Serialize};

/// Model used when neither the file nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-preview-0409";

/// Complete host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Identity announced to protocol clients.
    pub server: ServerSection,
    /// Where contract records come from.
    pub source: SourceSection,
    /// Backend and sampling settings.
    pub generation: GenerationSection,
    /// Invocation concurrency.
    pub execution: ExecutionSection,
    /// Severities of the configurable business rules.
    pub validation: ValidatorConfig,
    /// Log output.
    pub telemetry: TelemetryConfig,
}

/// Protocol server identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Reported server name.
    pub name: String,
    /// Reported server version.
    pub version: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: "ASM-Swarm-Host".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Contract data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    /// JSON file holding contract records.
    pub contracts_path: PathBuf,
    /// Records requested per page.
    pub page_size: usize,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            contracts_path: PathBuf::from("contracts.json"),
            page_size: 100,
        }
    }
}

/// Generation backend settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSection {
    /// Model used for contracts that name none.
    pub default_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token bound.
    pub max_output_tokens: u32,
    /// Per-invocation timeout in seconds.
    pub invocation_timeout_secs: u64,
    /// Backend endpoint.
    pub base_url: String,
    /// Backend API key; never serialised.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for GenerationSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSection")
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("invocation_timeout_secs", &self.invocation_timeout_secs)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for GenerationSection {
    fn default() -> Self {
        let sampling = GenerationConfig::default();
        Self {
            default_model: DEFAULT_MODEL.to_owned(),
            temperature: sampling.temperature,
            max_output_tokens: sampling.max_output_tokens,
            invocation_timeout_secs: 60,
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
        }
    }
}

impl GenerationSection {
    /// Sampling settings sent with every call.
    #[must_use]
    pub const fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    /// Per-invocation timeout.
    #[must_use]
    pub const fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }

    /// Connection settings for the Gemini backend.
    ///
    /// # Errors
    ///
    /// Returns an adapter error when `base_url` is not a valid URI.
    pub fn gemini_config(&self) -> AdapterResult<GeminiConfig> {
        let mut config = GeminiConfig::new().with_base_url(&self.base_url)?;
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        Ok(config)
    }
}

/// Invocation execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionSection {
    /// Maximum concurrently running invocations.
    pub max_concurrency: usize,
    /// Admitted invocations allowed to wait for a running slot; calls beyond
    /// this are refused as busy.
    pub max_queued: usize,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            max_concurrency: 32,
            max_queued: 256,
        }
    }
}
