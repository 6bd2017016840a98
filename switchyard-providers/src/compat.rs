//! OpenAI-compatible wire format.
//!
//! OpenAI, Cody.su, and OpenRouter all speak this dialect:
//!
//! ```text
//! GET  {base}/models
//! POST {base}/chat/completions
//! Authorization: Bearer <api_key>
//! ```
//!
//! The client here handles transport and error-body extraction; adapters
//! layer credential handling and catalog enrichment on top.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use switchyard_core::{ChatRequest, ChatResponse, GatewayError, ProviderId, TokenUsage};
use switchyard_store::KeyRotationManager;

use crate::error::AdapterError;

// ============================================================================
// Wire Types
// ============================================================================

/// Outgoing message in the OpenAI dialect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message role.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
pub struct ChatPayload {
    /// Target model id.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<WireMessage>,
    /// Token cap, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Streaming flag (always false through the gateway core).
    pub stream: bool,
}

impl ChatPayload {
    /// Builds a payload from the unified request.
    pub fn from_request(request: &ChatRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: request.stream,
        }
    }
}

/// One choice in a chat completion reply.
#[derive(Debug, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: WireMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage block in a reply.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WireUsage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Prompt plus completion.
    #[serde(default)]
    pub total_tokens: u32,
}

/// Chat completion reply.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    /// Provider-assigned id.
    pub id: String,
    /// Model that answered.
    pub model: String,
    /// Generated choices; the gateway uses the first.
    pub choices: Vec<Choice>,
    /// Token usage, when reported.
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

impl ChatReply {
    /// Converts the reply into the unified response shape.
    pub fn into_response(mut self) -> ChatResponse {
        let choice = if self.choices.is_empty() {
            None
        } else {
            Some(self.choices.remove(0))
        };
        ChatResponse {
            id: self.id,
            model: self.model,
            content: choice.as_ref().map(|c| c.message.content.clone()).unwrap_or_default(),
            usage: self.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason),
        }
    }
}

/// Model list reply.
#[derive(Debug, Deserialize)]
pub struct ModelsReply {
    /// Catalog entries.
    pub data: Vec<ModelEntry>,
}

/// One catalog entry; only the id is guaranteed across dialects.
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    /// Model identifier.
    pub id: String,
}

/// Error envelope in the OpenAI dialect.
#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Extracts a readable error message from a response body, keeping the
/// vendor's error code visible for rate-limit classification.
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorReply>(body) {
        Ok(reply) => {
            let code = reply.error.code.or(reply.error.kind);
            match code {
                Some(code) => format!("{code}: {}", reply.error.message),
                None => reply.error.message,
            }
        }
        Err(_) => {
            let mut message = body.trim().to_string();
            message.truncate(200);
            message
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for one OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct CompatClient {
    http: Client,
    base_url: String,
}

impl CompatClient {
    /// Creates a client for the given base URL (no trailing slash).
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetches the model catalog; returns raw model ids.
    pub async fn list_models(&self, api_key: &str) -> Result<Vec<String>, AdapterError> {
        let url = format!("{}/models", self.base_url);
        debug!(url = %url, "Fetching model catalog");

        let response = self.http.get(&url).bearer_auth(api_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let reply: ModelsReply = response.json().await?;
        Ok(reply.data.into_iter().map(|m| m.id).collect())
    }

    /// Executes a chat completion.
    pub async fn chat(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, AdapterError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatPayload::from_request(request);
        debug!(url = %url, model = %payload.model, "Chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply.into_response())
    }
}

// ============================================================================
// Credential-rotated Calls
// ============================================================================

/// Runs a chat completion through the key rotation manager: acquire a
/// credential, call, report the outcome with rate-limit classification, and
/// map into the gateway taxonomy.
///
/// Shared by every adapter speaking this dialect.
pub(crate) async fn rotated_chat(
    provider: ProviderId,
    client: &CompatClient,
    keys: &KeyRotationManager,
    request: &ChatRequest,
) -> Result<ChatResponse, GatewayError> {
    let Some(acquired) = keys.acquire(provider).await else {
        return Err(GatewayError::NoCredentialAvailable { provider });
    };

    match client.chat(&acquired.secret, request).await {
        Ok(response) => {
            keys.report_success(provider, &acquired.secret).await;
            Ok(response)
        }
        Err(err) => {
            let message = err.to_string();
            let rate_limited = crate::signatures::is_rate_limit(provider, err.status(), &message);
            keys.report_failure(provider, &acquired.secret, &message, rate_limited)
                .await;
            warn!(provider = %provider, key = %acquired.name, error = %message, "Chat completion failed");
            if rate_limited {
                Err(GatewayError::RateLimited { provider })
            } else {
                Err(GatewayError::Upstream { provider, message })
            }
        }
    }
}

/// Fetches the raw model id list with an acquired credential.
///
/// Catalog fetches are best-effort and do not feed credential health: a
/// missing key or transient failure yields `None` and a warning, never an
/// error to the caller.
pub(crate) async fn rotated_list(
    provider: ProviderId,
    client: &CompatClient,
    keys: &KeyRotationManager,
) -> Option<Vec<String>> {
    let Some(acquired) = keys.acquire(provider).await else {
        warn!(provider = %provider, "No credential available for catalog fetch");
        return None;
    };

    match client.list_models(&acquired.secret).await {
        Ok(ids) => Some(ids),
        Err(err) => {
            warn!(provider = %provider, error = %err, "Catalog fetch failed");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
