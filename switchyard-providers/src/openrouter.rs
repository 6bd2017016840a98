//! OpenRouter adapter.
//!
//! OpenRouter is OpenAI-compatible; the gateway only routes its free tier
//! (model ids with the `:free` suffix), so every descriptor carries zero
//! costs.

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
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Suffix OpenRouter puts on free-tier model ids.
const FREE_SUFFIX: &str = ":free";

/// Adapter for the OpenRouter API.
pub struct OpenRouterAdapter {
    client: CompatClient,
    keys: Arc<KeyRotationManager>,
    enabled: bool,
}

impl OpenRouterAdapter {
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
impl ProviderAdapter for OpenRouterAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenRouter
    }

    async fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id(),
            display_name: self.id().display_name().to_string(),
            description: "Free-tier models via OpenRouter (ids ending in :free)".to_string(),
            enabled: self.enabled,
            available: self.is_available().await,
        }
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let Some(ids) = rotated_list(self.id(), &self.client, &self.keys).await else {
            return Vec::new();
        };
        ids.iter()
            .filter(|id| is_free_model(id))
            .map(|id| describe(id))
            .collect()
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        rotated_chat(self.id(), &self.client, &self.keys, request).await
    }

    async fn is_available(&self) -> bool {
        self.keys.provider_status(self.id()).await.available
    }
}

fn is_free_model(id: &str) -> bool {
    id.ends_with(FREE_SUFFIX)
}

fn describe(id: &str) -> ModelDescriptor {
    let mut m = ModelDescriptor::new(id, id);
    m.description = Some(format!("Free OpenRouter model: {id}"));
    m.input_cost_per_token = Some(0.0);
    m.output_cost_per_token = Some(0.0);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_suffix_filter() {
        assert!(is_free_model("meta-llama/llama-3-8b:free"));
        assert!(!is_free_model("openai/gpt-4-turbo"));
        assert!(!is_free_model("free"));
    }

    #[test]
    fn test_describe_marks_zero_cost() {
        let m = describe("mistralai/mistral-7b:free");
        assert_eq!(m.input_cost_per_token, Some(0.0));
        assert_eq!(m.output_cost_per_token, Some(0.0));
    }
}
