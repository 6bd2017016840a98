//! OpenAI adapter.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use switchyard_core::{
    ChatRequest, ChatResponse, GatewayError, ModelDescriptor, ProviderAdapter, ProviderId,
    ProviderInfo,
};
use switchyard_store::{KeyRotationManager, ProviderSettings};

use crate::compat::{CompatClient, rotated_chat, rotated_list};

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Adapter for the OpenAI API.
pub struct OpenAiAdapter {
    client: CompatClient,
    keys: Arc<KeyRotationManager>,
    enabled: bool,
}

impl OpenAiAdapter {
    /// Creates the adapter from provider settings.
    pub fn new(settings: &ProviderSettings, keys: Arc<KeyRotationManager>, http: Client) -> Self {
        let base_url = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Self {
            client: CompatClient::new(http, base_url),
            keys,
            enabled: settings.enabled,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id(),
            display_name: self.id().display_name().to_string(),
            description: "OpenAI models (GPT-4, GPT-3.5 Turbo, DALL-E, Whisper)".to_string(),
            enabled: self.enabled,
            available: self.is_available().await,
        }
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let Some(ids) = rotated_list(self.id(), &self.client, &self.keys).await else {
            return Vec::new();
        };
        ids.iter().map(|id| describe(id)).collect()
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        rotated_chat(self.id(), &self.client, &self.keys, request).await
    }

    async fn is_available(&self) -> bool {
        self.keys.provider_status(self.id()).await.available
    }
}

/// Enriches a catalog id with what is known about the common OpenAI models;
/// unknown ids fall back to a bare descriptor.
fn describe(id: &str) -> ModelDescriptor {
    let mut m = ModelDescriptor::new(id, id);
    match id {
        "gpt-4" => {
            m.name = "GPT-4".into();
            m.description = Some("Most capable GPT-4 model".into());
            m.context_length = Some(8192);
            m.input_cost_per_token = Some(0.000_03);
            m.output_cost_per_token = Some(0.000_06);
            m.supports_function_calling = true;
        }
        "gpt-4-turbo" | "gpt-4-turbo-preview" => {
            m.name = "GPT-4 Turbo".into();
            m.description = Some("GPT-4 with a larger context window".into());
            m.context_length = Some(128_000);
            m.input_cost_per_token = Some(0.000_01);
            m.output_cost_per_token = Some(0.000_03);
            m.supports_function_calling = true;
        }
        "gpt-3.5-turbo" => {
            m.name = "GPT-3.5 Turbo".into();
            m.description = Some("Fast and efficient model for most tasks".into());
            m.context_length = Some(4096);
            m.input_cost_per_token = Some(0.000_001_5);
            m.output_cost_per_token = Some(0.000_002);
            m.supports_function_calling = true;
        }
        "gpt-3.5-turbo-16k" => {
            m.name = "GPT-3.5 Turbo 16K".into();
            m.description = Some("GPT-3.5 Turbo with an extended context".into());
            m.context_length = Some(16_384);
            m.input_cost_per_token = Some(0.000_003);
            m.output_cost_per_token = Some(0.000_004);
            m.supports_function_calling = true;
        }
        "dall-e-3" | "dall-e-2" => {
            m.name = if id == "dall-e-3" { "DALL-E 3".into() } else { "DALL-E 2".into() };
            m.description = Some("Image generation model".into());
            m.supports_streaming = false;
        }
        "whisper-1" => {
            m.name = "Whisper".into();
            m.description = Some("Speech recognition model".into());
            m.supports_streaming = false;
        }
        "text-embedding-ada-002" => {
            m.name = "Text Embedding Ada 002".into();
            m.description = Some("Text embedding model".into());
            m.context_length = Some(8191);
            m.input_cost_per_token = Some(0.000_000_1);
            m.supports_streaming = false;
        }
        _ => {
            m.description = Some(format!("OpenAI model: {id}"));
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_model() {
        let m = describe("gpt-4-turbo");
        assert_eq!(m.name, "GPT-4 Turbo");
        assert_eq!(m.context_length, Some(128_000));
        assert!(m.supports_function_calling);
    }

    #[test]
    fn test_describe_unknown_model_falls_back() {
        let m = describe("gpt-9-experimental");
        assert_eq!(m.id, "gpt-9-experimental");
        assert_eq!(m.name, "gpt-9-experimental");
        assert!(m.context_length.is_none());
        assert!(m.supports_streaming);
    }

    #[test]
    fn test_embedding_model_does_not_stream() {
        assert!(!describe("text-embedding-ada-002").supports_streaming);
    }
}
