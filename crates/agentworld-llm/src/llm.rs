//! Generation backends.
//!
//! Defines an enum-based dispatch for backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs (`OpenAI`, Ollama,
//! `DeepSeek`), the Anthropic Messages API, and an in-process scripted
//! responder. The HTTP backends communicate via `reqwest`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::{BackendType, ShardConfig};
use crate::error::GenerationError;
use crate::prompt::RenderedPrompt;

/// One call to a backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System and user messages.
    pub prompt: RenderedPrompt,
    /// Model to use instead of the shard's configured model.
    pub model_hint: Option<String>,
    /// Upper bound on response length.
    pub max_tokens: u32,
    /// Deadline for the whole HTTP exchange.
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// Unified backend enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// A backend that can turn a prompt into text.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
#[derive(Debug, Clone)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// In-process canned responder.
    Scripted(Arc<ScriptedBackend>),
}

impl LlmBackend {
    /// Send a prompt and return the trimmed response text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Timeout`] if the request deadline passes,
    /// [`GenerationError::Backend`] if the call fails or the response
    /// cannot be extracted, and [`GenerationError::EmptyResponse`] if the
    /// text is blank.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let text = match self {
            Self::OpenAi(backend) => backend.complete(request).await?,
            Self::Anthropic(backend) => backend.complete(request).await?,
            Self::Scripted(backend) => backend.complete(request).await?,
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(trimmed.to_owned())
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Scripted(_) => "scripted",
        }
    }
}

/// Map a transport error, keeping timeouts distinct.
fn transport_error(provider: &str, timeout: Duration, e: &reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::timeout(timeout)
    } else {
        GenerationError::Backend(format!("{provider} request failed: {e}"))
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &ShardConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.api_url);
        let model = request.model_hint.as_deref().unwrap_or(&self.model);

        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": request.prompt.system},
                {"role": "user", "content": request.prompt.user}
            ],
            "temperature": 0.7,
            "max_tokens": request.max_tokens
        });

        let mut builder = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", request.timeout, &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(GenerationError::Backend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| transport_error("OpenAI", request.timeout, &e))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            GenerationError::Backend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - Messages array does not include system (system is a top-level field)
/// - Response structure differs: `content[0].text`
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &ShardConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/messages", self.api_url);
        let model = request.model_hint.as_deref().unwrap_or(&self.model);

        let body = serde_json::json!({
            "model": model,
            "max_tokens": request.max_tokens,
            "system": request.prompt.system,
            "messages": [
                {"role": "user", "content": request.prompt.user}
            ]
        });

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Anthropic", request.timeout, &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(GenerationError::Backend(format!(
                "Anthropic returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| transport_error("Anthropic", request.timeout, &e))?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            GenerationError::Backend("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// What the scripted backend answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Always answer with this text.
    Text(String),
    /// Always fail with this message.
    Fail(String),
}

/// In-process backend with a fixed answer and optional latency.
///
/// Counts calls and tracks peak concurrency so callers can observe how
/// often, and how many at once, it was invoked.
#[derive(Debug)]
pub struct ScriptedBackend {
    reply: ScriptedReply,
    latency: Duration,
    calls: AtomicU64,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedBackend {
    /// Create a scripted backend.
    pub const fn new(reply: ScriptedReply, latency: Duration) -> Self {
        Self {
            reply,
            latency,
            calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Shorthand for a backend that always answers `text` immediately.
    pub fn replying(text: &str) -> Self {
        Self::new(ScriptedReply::Text(text.to_owned()), Duration::ZERO)
    }

    /// Shorthand for a backend that always fails immediately.
    pub fn failing(message: &str) -> Self {
        Self::new(ScriptedReply::Fail(message.to_owned()), Duration::ZERO)
    }

    /// Number of calls started.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.latency.is_zero() {
            if self.latency > request.timeout {
                tokio::time::sleep(request.timeout).await;
                return Err(GenerationError::timeout(request.timeout));
            }
            tokio::time::sleep(self.latency).await;
        }
        match &self.reply {
            ScriptedReply::Text(text) => Ok(text.clone()),
            ScriptedReply::Fail(message) => Err(GenerationError::Backend(message.clone())),
        }
    }
}

/// Decrements the in-flight counter when a scripted call ends, including
/// when its future is dropped mid-sleep.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a backend from shard configuration.
pub fn create_backend(config: &ShardConfig) -> LlmBackend {
    match config.backend {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
        BackendType::Scripted => {
            let reply = if config.fail {
                ScriptedReply::Fail("scripted failure".to_owned())
            } else {
                ScriptedReply::Text(config.reply.clone().unwrap_or_default())
            };
            LlmBackend::Scripted(Arc::new(ScriptedBackend::new(
                reply,
                Duration::from_millis(config.latency_ms),
            )))
        }
    }
}
