//! Google Gemini generation backend.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::header::{CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, Request, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client};
use crate::traits::{AdapterError, AdapterResult, GenerationBackend, GenerationRequest};

/// Environment variable holding the API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Public endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Connection settings shared by every Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
    api_key: Option<String>,
    base_url: String,
    request_timeout: Duration,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    /// Creates a configuration pointing at the public endpoint, without a key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the API key from `GEMINI_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: env::var(GEMINI_API_KEY_ENV).ok().filter(|key| !key.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the transport-level timeout of a single request.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns `true` when an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Gemini client bound to a single model.
pub struct GeminiBackend {
    client: HyperClient,
    endpoint: String,
    model: String,
    api_key: String,
    request_timeout: Duration,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Creates a client for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing.
    pub fn new(config: &GeminiConfig, model: impl Into<String>) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AdapterError::configuration("Gemini backend requires an API key"))?;
        let model = model.into();
        let endpoint = format!("{}v1beta/models/{model}:generateContent", config.base_url);

        Ok(Self {
            client: build_https_client()?,
            endpoint,
            model,
            api_key,
            request_timeout: config.request_timeout,
        })
    }

    fn build_payload(request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .prior_turns()
            .iter()
            .map(|turn| Content::user(turn.clone()))
            .collect();
        contents.push(Content::user(request.task_text().to_owned()));

        let config = request.config();
        GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: Some(request.system_text().to_owned()),
                }],
            },
            contents,
            generation_config: WireGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> AdapterResult<Option<String>> {
        let body = serde_json::to_vec(&Self::build_payload(request)).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode Gemini request: {err}"))
        })?;

        let uri = self
            .endpoint
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("invalid Gemini endpoint: {err}")))?;
        let req = Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.api_key)
            .body(Body::from(body))
            .map_err(|err| AdapterError::transport(format!("failed to build Gemini request: {err}")))?;

        let response = tokio::time::timeout(self.request_timeout, self.client.request(req))
            .await
            .map_err(|_| AdapterError::transport("Gemini request timed out"))?
            .map_err(|err| AdapterError::transport(format!("Gemini request failed: {err}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(AdapterError::RateLimited { retry_after });
        }

        let bytes = to_bytes(response.into_body())
            .await
            .map_err(|err| AdapterError::transport(format!("failed to read Gemini response: {err}")))?;

        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes);
            return Err(AdapterError::response(format!("Gemini returned {status}: {reason}")));
        }

        let decoded: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|err| AdapterError::response(format!("failed to decode Gemini response: {err}")))?;
        let text = decoded.first_text();
        debug!(model = %self.model, empty = text.is_none(), "Gemini generation finished");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: Some("user".to_owned()),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.is_empty())
    }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "Gemini base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid Gemini base URL: {err}")))?;
    Ok(base)
}
