//! HTTP routes for the gateway.
//!
//! Thin translation layer: handlers parse parameters, call the injected
//! components, and wrap results in a `{success, ...}` envelope. All gateway
//! behavior lives below this crate.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use switchyard_core::{ChatRequest, GatewayError, ProviderId};

use crate::error::ApiError;
use crate::state::AppState;

/// Window used for the statistics endpoint's popularity queries.
const POPULARITY_WINDOW_DAYS: u32 = 7;

/// Cap on the popular-models list.
const POPULAR_MODELS_LIMIT: u32 = 10;

/// Builds the full router.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/providers", get(list_providers))
        .route("/models", get(models_by_provider))
        .route("/models/by-category", get(models_by_category))
        .route("/models/categories", get(categories))
        .route("/models/search", get(search_models))
        .route("/models/refresh", post(refresh_models))
        .route("/chat/completions", post(chat_completions))
        .route("/statistics", get(statistics))
        .route("/cache/info", get(cache_info))
        .route("/cache", delete(clear_cache))
        .route("/keys", get(key_statuses).post(add_key).delete(remove_key))
        .route("/{provider}/models", get(provider_models))
        .route("/{provider}/status", get(provider_status))
        .route("/{provider}/chat/completions", post(provider_chat));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(cors)
        .with_state(state)
}

fn parse_provider(name: &str) -> Result<ProviderId, ApiError> {
    name.parse::<ProviderId>()
        .map_err(|_| ApiError(GatewayError::ProviderNotFound(name.to_string())))
}

// ============================================================================
// Service Info
// ============================================================================

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Switchyard",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "A gateway that unifies multiple AI model providers behind one API",
        "api_base": "/api/v1",
        "endpoints": {
            "providers": "/api/v1/providers",
            "models": "/api/v1/models",
            "models_by_category": "/api/v1/models/by-category",
            "search": "/api/v1/models/search",
            "chat": "/api/v1/chat/completions",
            "statistics": "/api/v1/statistics",
            "cache": "/api/v1/cache/info",
            "keys": "/api/v1/keys"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let infos = state.dispatcher.provider_infos().await;
    let available = infos.iter().filter(|i| i.available).count();
    let cache = state.cache.info().await;

    Json(json!({
        "success": true,
        "status": "healthy",
        "providers": {
            "total": infos.len(),
            "available": available,
            "unavailable": infos.len() - available,
        },
        "cache": cache,
    }))
}

// ============================================================================
// Providers & Models
// ============================================================================

async fn list_providers(State(state): State<AppState>) -> Json<Value> {
    let providers = state.dispatcher.provider_infos().await;
    Json(json!({
        "success": true,
        "total_count": providers.len(),
        "providers": providers,
    }))
}

#[derive(Deserialize)]
struct ModelsQuery {
    #[serde(default = "default_true")]
    use_cache: bool,
}

fn default_true() -> bool {
    true
}

async fn models_by_provider(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Json<Value> {
    let models = state.dispatcher.models_by_provider(query.use_cache).await;
    let total: usize = models.iter().map(|p| p.models.len()).sum();
    Json(json!({
        "success": true,
        "providers_count": models.len(),
        "total_models": total,
        "models": models,
    }))
}

#[derive(Deserialize)]
struct CategoryQuery {
    category: Option<String>,
}

async fn models_by_category(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Json<Value> {
    let grouped = state
        .dispatcher
        .models_by_category(query.category.as_deref())
        .await;
    let total: usize = grouped.values().map(Vec::len).sum();
    Json(json!({
        "success": true,
        "categories_count": grouped.len(),
        "total_models": total,
        "models": grouped,
    }))
}

async fn categories(State(state): State<AppState>) -> Json<Value> {
    let categories = state.dispatcher.categories();
    Json(json!({
        "success": true,
        "total_count": categories.len(),
        "categories": categories,
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    provider: Option<String>,
}

async fn search_models(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let provider = query.provider.as_deref().map(parse_provider).transpose()?;
    let models = state.dispatcher.search_models(&query.q, provider).await;
    Ok(Json(json!({
        "success": true,
        "query": query.q,
        "provider_filter": query.provider,
        "total_found": models.len(),
        "models": models,
    })))
}

#[derive(Deserialize)]
struct ProviderFilterQuery {
    provider: Option<String>,
}

async fn refresh_models(
    State(state): State<AppState>,
    Query(query): Query<ProviderFilterQuery>,
) -> Result<Json<Value>, ApiError> {
    let provider = query.provider.as_deref().map(parse_provider).transpose()?;
    let outcome = state.dispatcher.refresh_models(provider).await;
    Ok(Json(json!({
        "success": true,
        "result": outcome,
    })))
}

// ============================================================================
// Chat
// ============================================================================

async fn chat_completions(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let (response, elapsed_ms) = state.dispatcher.chat_completion(&request).await?;
    Ok(Json(json!({
        "success": true,
        "response": response,
        "response_time_ms": elapsed_ms,
    })))
}

async fn provider_chat(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let provider = parse_provider(&provider)?;
    let adapter = state
        .dispatcher
        .adapter_for(provider)
        .ok_or_else(|| ApiError(GatewayError::ProviderNotFound(provider.to_string())))?;

    if !adapter.is_available().await {
        return Err(ApiError(GatewayError::NoCredentialAvailable { provider }));
    }

    // The model must belong to the addressed provider; cross-provider
    // requests on this route are caller errors, not routing work.
    let resolved = state
        .dispatcher
        .resolve_provider(&request.model)
        .await
        .ok_or_else(|| ApiError(GatewayError::ModelNotRoutable(request.model.clone())))?;
    if resolved.id() != provider {
        return Err(ApiError::invalid(format!(
            "model {} does not belong to provider {provider}",
            request.model
        )));
    }

    let (response, elapsed_ms) = state.dispatcher.chat_completion(&request).await?;
    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "response": response,
        "response_time_ms": elapsed_ms,
    })))
}

// ============================================================================
// Per-provider Views
// ============================================================================

async fn provider_models(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<Value>, ApiError> {
    let provider = parse_provider(&provider)?;
    let all = state.dispatcher.models_by_provider(query.use_cache).await;
    let entry = all
        .into_iter()
        .find(|p| p.provider == provider)
        .ok_or_else(|| ApiError(GatewayError::ProviderNotFound(provider.to_string())))?;

    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "total_models": entry.models.len(),
        "models": entry.models,
    })))
}

async fn provider_status(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let provider = parse_provider(&provider)?;
    let adapter = state
        .dispatcher
        .adapter_for(provider)
        .ok_or_else(|| ApiError(GatewayError::ProviderNotFound(provider.to_string())))?;

    let info = adapter.info().await;
    let keys = state.keys.provider_status(provider).await;
    let usage = state
        .stats
        .popular_providers(POPULARITY_WINDOW_DAYS)
        .map_err(|e| ApiError(GatewayError::Persistence(e.to_string())))?
        .into_iter()
        .find(|p| p.provider == provider.as_str());

    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "info": info,
        "keys": keys,
        "statistics": usage,
    })))
}

// ============================================================================
// Statistics
// ============================================================================

async fn statistics(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let persistence = |e: switchyard_store::StoreError| ApiError(GatewayError::Persistence(e.to_string()));
    let summary = state.stats.summary().map_err(persistence)?;
    let popular_providers = state
        .stats
        .popular_providers(POPULARITY_WINDOW_DAYS)
        .map_err(persistence)?;
    let popular_models = state
        .stats
        .popular_models(POPULARITY_WINDOW_DAYS, POPULAR_MODELS_LIMIT)
        .map_err(persistence)?;

    Ok(Json(json!({
        "success": true,
        "statistics": {
            "summary": summary,
            "popular_providers": popular_providers,
            "popular_models": popular_models,
        }
    })))
}

// ============================================================================
// Cache Management
// ============================================================================

async fn cache_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "cache": state.cache.info().await,
    }))
}

async fn clear_cache(
    State(state): State<AppState>,
    Query(query): Query<ProviderFilterQuery>,
) -> Result<Json<Value>, ApiError> {
    let provider = query.provider.as_deref().map(parse_provider).transpose()?;
    state.cache.invalidate(provider).await;
    let message = match provider {
        Some(p) => format!("cache cleared for {p}"),
        None => "cache cleared".to_string(),
    };
    Ok(Json(json!({"success": true, "message": message})))
}

// ============================================================================
// Credential Management
// ============================================================================

async fn key_statuses(State(state): State<AppState>) -> Json<Value> {
    let statuses = state.keys.all_statuses().await;
    Json(json!({
        "success": true,
        "providers": statuses,
    }))
}

#[derive(Deserialize)]
struct AddKeyBody {
    provider: String,
    key: String,
    name: Option<String>,
    #[serde(default = "default_priority")]
    priority: u32,
}

fn default_priority() -> u32 {
    1
}

async fn add_key(
    State(state): State<AppState>,
    Json(body): Json<AddKeyBody>,
) -> Result<Json<Value>, ApiError> {
    let provider = parse_provider(&body.provider)?;
    if body.key.is_empty() {
        return Err(ApiError::invalid("key must not be empty"));
    }

    let added = state
        .keys
        .add_key(provider, body.key, body.name, body.priority)
        .await;
    if added {
        Ok(Json(json!({"success": true, "message": format!("key added for {provider}")})))
    } else {
        Err(ApiError::invalid("key already exists for this provider"))
    }
}

#[derive(Deserialize)]
struct RemoveKeyBody {
    provider: String,
    key: String,
}

async fn remove_key(
    State(state): State<AppState>,
    Json(body): Json<RemoveKeyBody>,
) -> Result<Json<Value>, ApiError> {
    let provider = parse_provider(&body.provider)?;
    let removed = state.keys.remove_key(provider, &body.key).await;
    if removed {
        Ok(Json(json!({"success": true, "message": format!("key removed for {provider}")})))
    } else {
        Err(ApiError::invalid("no matching key for this provider"))
    }
}
