//! Google Gemini adapter.
//!
//! Gemini speaks its own dialect:
//!
//! ```text
//! GET  {base}/models?key=<api_key>
//! POST {base}/{model}:generateContent?key=<api_key>
//! ```
//!
//! Roles map as `assistant -> model`; system messages travel in the
//! dedicated `systemInstruction` field.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use switchyard_core::{
    ChatRequest, ChatResponse, GatewayError, ModelDescriptor, ProviderAdapter, ProviderId,
    ProviderInfo, TokenUsage,
};
use switchyard_store::{KeyRotationManager, ProviderSettings};

use crate::error::AdapterError;
use crate::signatures;

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GeneratePayload {
    fn from_request(request: &ChatRequest) -> Self {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in &request.messages {
            match message.role.as_str() {
                "system" => system_parts.push(Part {
                    text: message.content.clone(),
                }),
                role => contents.push(Content {
                    role: Some(if role == "assistant" { "model" } else { "user" }.to_string()),
                    parts: vec![Part {
                        text: message.content.clone(),
                    }],
                }),
            }
        }

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        Self {
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: system_parts,
                })
            },
            contents,
            generation_config,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogModel {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    input_token_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CatalogReply {
    #[serde(default)]
    models: Vec<CatalogModel>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorReply>(body) {
        Ok(reply) => match reply.error.status {
            Some(status) => format!("{status}: {}", reply.error.message),
            None => reply.error.message,
        },
        Err(_) => {
            let mut message = body.trim().to_string();
            message.truncate(200);
            message
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Adapter for the Google Gemini API.
pub struct GeminiAdapter {
    http: Client,
    base_url: String,
    keys: Arc<KeyRotationManager>,
    enabled: bool,
}

impl GeminiAdapter {
    /// Creates the adapter from provider settings.
    pub fn new(settings: &ProviderSettings, keys: Arc<KeyRotationManager>, http: Client) -> Self {
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        Self {
            http,
            base_url,
            keys,
            enabled: settings.enabled,
        }
    }

    async fn fetch_catalog(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, AdapterError> {
        let url = format!("{}/models", self.base_url);
        debug!(url = %url, "Fetching Gemini catalog");

        let response = self
            .http
            .get(&url)
            .query(&[("key", api_key)])
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

        let reply: CatalogReply = response.json().await?;
        Ok(reply.models.into_iter().map(describe).collect())
    }

    async fn generate(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, AdapterError> {
        // Model ids arrive either bare ("gemini-pro") or fully qualified
        // ("models/gemini-pro"); the endpoint needs the qualified form.
        let model_path = if request.model.contains('/') {
            request.model.clone()
        } else {
            format!("models/{}", request.model)
        };
        let url = format!("{}/{}:generateContent", self.base_url, model_path);
        let payload = GeneratePayload::from_request(request);
        debug!(url = %url, "Gemini generate request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
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

        let reply: GenerateReply = response.json().await?;
        let candidate = reply.candidates.into_iter().next();
        let content = candidate
            .as_ref()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            // Gemini replies carry no id; synthesize one.
            id: format!("gemini-{}", Utc::now().timestamp_millis()),
            model: request.model.clone(),
            content,
            usage: reply.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            finish_reason: candidate.and_then(|c| c.finish_reason),
        })
    }
}

/// Maps a catalog entry to a descriptor; the API publishes enough detail
/// that no static enrichment table is needed.
fn describe(model: CatalogModel) -> ModelDescriptor {
    let mut m = ModelDescriptor::new(model.name.clone(), model.display_name.unwrap_or(model.name));
    m.description = model.description;
    m.context_length = model.input_token_limit;
    m
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id(),
            display_name: self.id().display_name().to_string(),
            description: "Google Gemini models".to_string(),
            enabled: self.enabled,
            available: self.is_available().await,
        }
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let Some(acquired) = self.keys.acquire(self.id()).await else {
            warn!(provider = %self.id(), "No credential available for catalog fetch");
            return Vec::new();
        };
        match self.fetch_catalog(&acquired.secret).await {
            Ok(models) => models,
            Err(err) => {
                warn!(provider = %self.id(), error = %err, "Catalog fetch failed");
                Vec::new()
            }
        }
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        let provider = self.id();
        let Some(acquired) = self.keys.acquire(provider).await else {
            return Err(GatewayError::NoCredentialAvailable { provider });
        };

        match self.generate(&acquired.secret, request).await {
            Ok(response) => {
                self.keys.report_success(provider, &acquired.secret).await;
                Ok(response)
            }
            Err(err) => {
                let message = err.to_string();
                let rate_limited = signatures::is_rate_limit(provider, err.status(), &message);
                self.keys
                    .report_failure(provider, &acquired.secret, &message, rate_limited)
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

    async fn is_available(&self) -> bool {
        self.keys.provider_status(self.id()).await.available
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::ChatMessage;

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: "gemini-pro".into(),
            messages,
            max_tokens: Some(100),
            temperature: Some(0.5),
            stream: false,
        }
    }

    #[test]
    fn test_payload_maps_roles_and_system_instruction() {
        let payload = GeneratePayload::from_request(&request(vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("hi"),
            ChatMessage {
                role: "assistant".into(),
                content: "hello".into(),
            },
        ]));

        let system = payload.system_instruction.unwrap();
        assert_eq!(system.parts[0].text, "be terse");
        assert_eq!(payload.contents.len(), 2);
        assert_eq!(payload.contents[0].role.as_deref(), Some("user"));
        assert_eq!(payload.contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let json = serde_json::to_string(&GeneratePayload::from_request(&request(vec![
            ChatMessage::user("hi"),
        ])))
        .unwrap();
        assert!(json.contains("generationConfig"));
        assert!(json.contains("maxOutputTokens"));
        assert!(!json.contains("systemInstruction"));
    }

    #[test]
    fn test_reply_parses_usage_and_finish_reason() {
        let reply: GenerateReply = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "hel"}, {"text": "lo"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
            }"#,
        )
        .unwrap();

        assert_eq!(reply.candidates.len(), 1);
        let usage = reply.usage_metadata.unwrap();
        assert_eq!(usage.total_token_count, 6);
    }

    #[test]
    fn test_catalog_entry_maps_to_descriptor() {
        let model: CatalogModel = serde_json::from_str(
            r#"{
                "name": "models/gemini-pro",
                "displayName": "Gemini Pro",
                "description": "Text model",
                "inputTokenLimit": 32768
            }"#,
        )
        .unwrap();

        let m = describe(model);
        assert_eq!(m.id, "models/gemini-pro");
        assert_eq!(m.name, "Gemini Pro");
        assert_eq!(m.context_length, Some(32_768));
    }

    #[test]
    fn test_error_extraction_includes_status() {
        let body = r#"{"error": {"message": "quota up", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(extract_error_message(body), "RESOURCE_EXHAUSTED: quota up");
    }
}
