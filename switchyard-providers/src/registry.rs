//! Adapter registry.
//!
//! Constructs the enabled adapters in canonical registration order. That
//! order fixes the model-resolution scan: the first provider listing a
//! model id wins ties.

use std::sync::Arc;
use tracing::{debug, info};

use switchyard_core::{ProviderAdapter, ProviderId};
use switchyard_store::{GatewayConfig, KeyRotationManager};

use crate::client::build_http_client;
use crate::cody::CodyAdapter;
use crate::error::AdapterError;
use crate::gemini::GeminiAdapter;
use crate::openai::OpenAiAdapter;
use crate::openrouter::OpenRouterAdapter;

/// Builds every enabled adapter in [`ProviderId::all`] order.
///
/// Adapters receive the shared key rotation manager by handle; nothing here
/// is ambient or global.
pub fn build_adapters(
    config: &GatewayConfig,
    keys: &Arc<KeyRotationManager>,
) -> Result<Vec<Arc<dyn ProviderAdapter>>, AdapterError> {
    let http = build_http_client()?;
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for id in ProviderId::all() {
        if !config.is_provider_enabled(*id) {
            debug!(provider = %id, "Provider disabled in configuration");
            continue;
        }
        let settings = config.provider_settings(*id);
        let adapter: Arc<dyn ProviderAdapter> = match id {
            ProviderId::OpenAi => {
                Arc::new(OpenAiAdapter::new(&settings, Arc::clone(keys), http.clone()))
            }
            ProviderId::Gemini => {
                Arc::new(GeminiAdapter::new(&settings, Arc::clone(keys), http.clone()))
            }
            ProviderId::Cody => {
                Arc::new(CodyAdapter::new(&settings, Arc::clone(keys), http.clone()))
            }
            ProviderId::OpenRouter => {
                Arc::new(OpenRouterAdapter::new(&settings, Arc::clone(keys), http.clone()))
            }
        };
        adapters.push(adapter);
    }

    info!(count = adapters.len(), "Registered provider adapters");
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_store::{CredentialsConfig, ProviderSettings};

    async fn manager(dir: &tempfile::TempDir) -> Arc<KeyRotationManager> {
        let config = CredentialsConfig {
            file: dir.path().join("credentials.yaml"),
            ..CredentialsConfig::default()
        };
        Arc::new(KeyRotationManager::load(&config).await.unwrap())
    }

    #[tokio::test]
    async fn test_all_providers_register_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let keys = manager(&dir).await;
        let adapters = build_adapters(&GatewayConfig::default(), &keys).unwrap();

        let ids: Vec<ProviderId> = adapters.iter().map(|a| a.id()).collect();
        assert_eq!(ids, ProviderId::all());
    }

    #[tokio::test]
    async fn test_disabled_provider_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let keys = manager(&dir).await;

        let mut config = GatewayConfig::default();
        config.providers.insert(
            ProviderId::Cody,
            ProviderSettings {
                enabled: false,
                ..ProviderSettings::default()
            },
        );

        let adapters = build_adapters(&config, &keys).unwrap();
        let ids: Vec<ProviderId> = adapters.iter().map(|a| a.id()).collect();
        assert_eq!(
            ids,
            vec![ProviderId::OpenAi, ProviderId::Gemini, ProviderId::OpenRouter]
        );
    }

    #[tokio::test]
    async fn test_adapters_report_unavailable_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        let keys = manager(&dir).await;
        let adapters = build_adapters(&GatewayConfig::default(), &keys).unwrap();

        for adapter in &adapters {
            assert!(!adapter.is_available().await);
        }
    }
}
