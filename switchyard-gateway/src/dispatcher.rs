//! The gateway dispatcher.
//!
//! Single entry point that turns a `(model, messages, options)` request
//! into a routed provider call plus a recorded outcome. Per request the
//! state machine is `Pending -> Resolved -> {Succeeded, Failed}`, with
//! `Pending -> Unroutable` when no provider claims the model. No retries
//! happen at this layer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use switchyard_core::{
    ChatRequest, ChatResponse, GatewayError, ModelDescriptor, ProviderAdapter, ProviderId,
    ProviderInfo, UsageEvent,
};
use switchyard_store::{ModelCache, StatisticsStore};

use crate::catalog::{Category, ModelCatalog};

// ============================================================================
// Result Shapes
// ============================================================================

/// A model annotated with its provider and category.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedModel {
    /// Provider that lists the model.
    pub provider: ProviderId,
    /// Category id from the catalog.
    pub category: String,
    /// The model itself, flattened into the same object.
    #[serde(flatten)]
    pub model: ModelDescriptor,
}

/// One provider's categorized model list.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderModels {
    /// The provider.
    pub provider: ProviderId,
    /// Its models; empty when the provider is unavailable.
    pub models: Vec<CategorizedModel>,
}

/// Result of a catalog refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshOutcome {
    /// Providers whose catalogs were re-fetched.
    pub updated: Vec<RefreshedProvider>,
    /// Per-provider failures; a failure never aborts the other refreshes.
    pub errors: Vec<String>,
}

/// One successfully refreshed provider.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedProvider {
    /// The provider.
    pub provider: ProviderId,
    /// Models now cached for it.
    pub model_count: usize,
}

// ============================================================================
// Usage Guard
// ============================================================================

/// Records the usage event for an in-flight request.
///
/// If the request future is dropped mid-call (client disconnect, timeout
/// upstream), the guard still records a failed event from `Drop`, so
/// statistics never silently under-count.
struct UsageGuard {
    stats: Arc<StatisticsStore>,
    provider: ProviderId,
    model: String,
    started: Instant,
    armed: bool,
}

impl UsageGuard {
    fn new(stats: Arc<StatisticsStore>, provider: ProviderId, model: String) -> Self {
        Self {
            stats,
            provider,
            model,
            started: Instant::now(),
            armed: true,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Records the final event and disarms the drop path. Recording is
    /// best-effort: a statistics failure never affects the request.
    fn finish(mut self, event: &UsageEvent) {
        self.armed = false;
        if let Err(e) = self.stats.record(event) {
            warn!(error = %e, "Failed to record usage event");
        }
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        if self.armed {
            let event = UsageEvent::failure(
                self.provider,
                self.model.clone(),
                "request cancelled before completion",
                self.elapsed_ms(),
            );
            if let Err(e) = self.stats.record(&event) {
                warn!(error = %e, "Failed to record cancellation event");
            }
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Orchestrates routing, timing, and usage accounting for every request.
pub struct Dispatcher {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    cache: Arc<ModelCache>,
    stats: Arc<StatisticsStore>,
    catalog: ModelCatalog,
}

impl Dispatcher {
    /// Creates the dispatcher.
    ///
    /// `adapters` must already be in canonical registration order; that
    /// order is the tie-break when several providers list the same model.
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        cache: Arc<ModelCache>,
        stats: Arc<StatisticsStore>,
        catalog: ModelCatalog,
    ) -> Self {
        Self {
            adapters,
            cache,
            stats,
            catalog,
        }
    }

    /// Returns display info for every registered provider.
    pub async fn provider_infos(&self) -> Vec<ProviderInfo> {
        let mut infos = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            infos.push(adapter.info().await);
        }
        infos
    }

    /// Returns the adapter registered for a provider, if any.
    pub fn adapter_for(&self, provider: ProviderId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.id() == provider)
    }

    /// Returns the configured categories.
    pub fn categories(&self) -> &[Category] {
        self.catalog.categories()
    }

    /// Fetches a provider's model list through the cache; a miss refreshes
    /// via the adapter and caches any non-empty result.
    async fn models_for(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        use_cache: bool,
    ) -> Vec<ModelDescriptor> {
        let provider = adapter.id();
        if use_cache {
            if let Some(models) = self.cache.get(provider).await {
                return models;
            }
        }

        let models = adapter.list_models().await;
        if models.is_empty() {
            debug!(provider = %provider, "Provider returned no models");
        } else {
            self.cache.put(provider, models.clone()).await;
        }
        models
    }

    fn annotate(&self, provider: ProviderId, models: Vec<ModelDescriptor>) -> Vec<CategorizedModel> {
        models
            .into_iter()
            .map(|model| CategorizedModel {
                provider,
                category: self.catalog.categorize(&model).to_string(),
                model,
            })
            .collect()
    }

    /// Returns every provider's categorized model list in registration
    /// order. Unavailable providers yield empty lists, never errors.
    pub async fn models_by_provider(&self, use_cache: bool) -> Vec<ProviderModels> {
        let mut result = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let provider = adapter.id();
            let models = if adapter.is_available().await {
                self.models_for(adapter, use_cache).await
            } else {
                debug!(provider = %provider, "Provider unavailable, skipping catalog");
                Vec::new()
            };
            result.push(ProviderModels {
                provider,
                models: self.annotate(provider, models),
            });
        }
        result
    }

    /// Groups every known model by category; with a filter, returns only
    /// that category's group.
    pub async fn models_by_category(
        &self,
        category: Option<&str>,
    ) -> BTreeMap<String, Vec<CategorizedModel>> {
        let mut grouped: BTreeMap<String, Vec<CategorizedModel>> = BTreeMap::new();
        for provider_models in self.models_by_provider(true).await {
            for model in provider_models.models {
                if category.is_some_and(|c| c != model.category) {
                    continue;
                }
                grouped.entry(model.category.clone()).or_default().push(model);
            }
        }
        grouped
    }

    /// Case-insensitive model search, optionally scoped to one provider.
    pub async fn search_models(
        &self,
        query: &str,
        provider: Option<ProviderId>,
    ) -> Vec<CategorizedModel> {
        let mut found = Vec::new();
        for provider_models in self.models_by_provider(true).await {
            if provider.is_some_and(|p| p != provider_models.provider) {
                continue;
            }
            for model in provider_models.models {
                if ModelCatalog::matches_query(&model.model, query) {
                    found.push(model);
                }
            }
        }
        found
    }

    /// Finds the provider that lists a model id. First match wins in
    /// registration order.
    pub async fn resolve_provider(&self, model_id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        for adapter in &self.adapters {
            if !adapter.is_available().await {
                continue;
            }
            let models = self.models_for(adapter, true).await;
            if models.iter().any(|m| m.id == model_id) {
                debug!(model = %model_id, provider = %adapter.id(), "Resolved provider for model");
                return Some(Arc::clone(adapter));
            }
        }
        None
    }

    /// Routes a chat request, times the adapter call, and records the
    /// outcome. The original failure is re-raised to the caller after the
    /// usage event is recorded.
    pub async fn chat_completion(
        &self,
        request: &ChatRequest,
    ) -> Result<(ChatResponse, u64), GatewayError> {
        let adapter = self
            .resolve_provider(&request.model)
            .await
            .ok_or_else(|| GatewayError::ModelNotRoutable(request.model.clone()))?;
        let provider = adapter.id();

        let guard = UsageGuard::new(Arc::clone(&self.stats), provider, request.model.clone());
        match adapter.chat_completion(request).await {
            Ok(response) => {
                let elapsed_ms = guard.elapsed_ms();
                guard.finish(&UsageEvent::success(
                    provider,
                    &request.model,
                    response.usage,
                    elapsed_ms,
                ));
                Ok((response, elapsed_ms))
            }
            Err(err) => {
                let elapsed_ms = guard.elapsed_ms();
                guard.finish(&UsageEvent::failure(
                    provider,
                    &request.model,
                    err.to_string(),
                    elapsed_ms,
                ));
                Err(err)
            }
        }
    }

    /// Force-refreshes cached catalogs for one provider or all of them.
    /// Partial failures are collected, never propagated.
    pub async fn refresh_models(&self, provider: Option<ProviderId>) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();

        let targets: Vec<Arc<dyn ProviderAdapter>> = match provider {
            Some(p) => match self.adapter_for(p) {
                Some(adapter) => vec![Arc::clone(adapter)],
                None => {
                    outcome.errors.push(format!("provider {p} is not registered"));
                    return outcome;
                }
            },
            None => self.adapters.clone(),
        };

        for adapter in targets {
            let id = adapter.id();
            self.cache.invalidate(Some(id)).await;
            let models = adapter.list_models().await;
            if models.is_empty() {
                outcome.errors.push(format!("{id}: no models returned"));
            } else {
                self.cache.put(id, models.clone()).await;
                outcome.updated.push(RefreshedProvider {
                    provider: id,
                    model_count: models.len(),
                });
            }
        }

        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================
