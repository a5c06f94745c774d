//! OpenAI-style request models used when the gateway has to translate.
//!
//! Passthrough routes never go through these types; they forward the raw
//! JSON object. The typed views below are only built for `/generate` and for
//! the chat → completions fallback.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// `max_tokens` forwarded when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 128;

/// `temperature` forwarded when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

// =============================================================================
// Shared generation controls
// =============================================================================

/// Stop sequence(s): a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequence {
    One(String),
    Many(Vec<String>),
}

/// Generation-control fields accepted by every request shape.
///
/// Numeric controls are kept as the caller's JSON number, so `64.0` stays
/// `64.0` and `1` stays `1` on the way out. A JSON `null` deserializes to
/// `None`, same as an absent key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate
    #[serde(default)]
    pub max_tokens: Option<Number>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<Number>,
    /// Nucleus sampling probability
    #[serde(default)]
    pub top_p: Option<Number>,
    /// Top-k sampling cutoff
    #[serde(default)]
    pub top_k: Option<Number>,
    /// Penalty applied to repeated tokens
    #[serde(default)]
    pub repetition_penalty: Option<Number>,
    /// Sequences that end generation
    #[serde(default)]
    pub stop: Option<StopSequence>,
}

// =============================================================================
// Outbound completion request
// =============================================================================

/// Body sent to the backend's `/completions` endpoint.
///
/// `max_tokens` and `temperature` are always present; the other controls
/// are omitted entirely when unset so the backend never sees explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model the backend should run
    pub model: String,
    /// Prompt text to complete
    pub prompt: String,
    /// Caller's value, or [`DEFAULT_MAX_TOKENS`]
    pub max_tokens: Value,
    /// Caller's value, or [`DEFAULT_TEMPERATURE`]
    pub temperature: Value,
    /// Nucleus sampling probability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Number>,
    /// Top-k sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<Number>,
    /// Penalty applied to repeated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<Number>,
    /// Sequences that end generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
}

impl CompletionRequest {
    /// Build a completion request, applying defaults for the two mandatory
    /// controls and carrying the rest only when set.
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: params
                .max_tokens
                .map_or_else(|| Value::from(DEFAULT_MAX_TOKENS), Value::Number),
            temperature: params
                .temperature
                .map_or_else(|| Value::from(DEFAULT_TEMPERATURE), Value::Number),
            top_p: params.top_p,
            top_k: params.top_k,
            repetition_penalty: params.repetition_penalty,
            stop: params.stop,
        }
    }
}

// =============================================================================
// Inbound shapes
// =============================================================================

/// Body of the convenience `/generate` route.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// Prompt text; absent, null and empty are all rejected
    #[serde(default)]
    pub prompt: Option<String>,
    /// Generation controls
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// A single chat message. Only `content` matters for the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author (system, user, assistant)
    #[serde(default)]
    pub role: Option<String>,
    /// Message text; a missing value flattens to an empty line
    #[serde(default)]
    pub content: Option<String>,
}

/// Typed view of a `/v1/chat/completions` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Requested model; the configured default applies when absent
    #[serde(default)]
    pub model: Option<String>,
    /// Conversation messages, in order
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Generation controls
    #[serde(flatten)]
    pub params: GenerationParams,
}

impl ChatRequest {
    /// Concatenate message contents in order, one per line.
    ///
    /// A message without content still occupies its line as an empty string.
    pub fn flatten_prompt(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Health
// =============================================================================

/// Response of `GET /healthz`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `true` while the process is serving
    pub ok: bool,
    /// Configured backend base URL
    pub backend_url: String,
    /// Configured default model
    pub model: String,
}
