//! Cody.su adapter.
//!
//! Cody.su exposes an OpenAI-compatible API with free models; when the
//! catalog endpoint is unreachable a built-in fallback list keeps the
//! provider routable.

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
const DEFAULT_BASE_URL: &str = "https://cody.su/api/v1";

/// Adapter for the Cody.su API.
pub struct CodyAdapter {
    client: CompatClient,
    keys: Arc<KeyRotationManager>,
    enabled: bool,
    fetch_models_dynamically: bool,
}

impl CodyAdapter {
    /// Creates the adapter from provider settings.
    pub fn new(settings: &ProviderSettings, keys: Arc<KeyRotationManager>, http: Client) -> Self {
        let base_url = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Self {
            client: CompatClient::new(http, base_url),
            keys,
            enabled: settings.enabled,
            fetch_models_dynamically: settings.fetch_models_dynamically,
        }
    }
}

#[async_trait]
impl ProviderAdapter for CodyAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Cody
    }

    async fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id(),
            display_name: self.id().display_name().to_string(),
            description: "Free models via the Cody.su OpenAI-compatible API".to_string(),
            enabled: self.enabled,
            available: self.is_available().await,
        }
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        if self.fetch_models_dynamically {
            if let Some(ids) = rotated_list(self.id(), &self.client, &self.keys).await {
                if !ids.is_empty() {
                    return ids.iter().map(|id| describe(id)).collect();
                }
            }
        }
        fallback_models()
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        rotated_chat(self.id(), &self.client, &self.keys, request).await
    }

    async fn is_available(&self) -> bool {
        self.keys.provider_status(self.id()).await.available
    }
}

/// Everything on Cody.su is free; descriptors carry zero costs.
fn describe(id: &str) -> ModelDescriptor {
    let mut m = ModelDescriptor::new(id, id);
    m.description = Some(format!("Cody.su model: {id}"));
    m.input_cost_per_token = Some(0.0);
    m.output_cost_per_token = Some(0.0);
    m
}

/// Catalog used when the models endpoint is unreachable.
fn fallback_models() -> Vec<ModelDescriptor> {
    ["gpt-4.1", "gpt-4o", "gpt-4o-mini", "gpt-image-1", "flux.1-kontext-pro"]
        .iter()
        .map(|id| describe(id))
        .collect()
}
