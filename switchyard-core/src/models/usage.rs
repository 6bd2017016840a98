//! Usage accounting types.

use serde::{Deserialize, Serialize};

use super::{ProviderId, TokenUsage};

// ============================================================================
// Usage Event
// ============================================================================

/// One recorded request outcome. Immutable, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Provider that served (or failed) the request.
    pub provider: ProviderId,
    /// Model the request targeted.
    pub model_id: String,
    /// Tokens in the request, when known.
    pub request_tokens: Option<u32>,
    /// Tokens in the response, when known.
    pub response_tokens: Option<u32>,
    /// Wall-clock elapsed time in milliseconds.
    pub response_time_ms: Option<u64>,
    /// Whether the request succeeded.
    pub success: bool,
    /// Error message for failed requests.
    pub error_message: Option<String>,
}

impl UsageEvent {
    /// Builds a success event from a response's token usage.
    pub fn success(
        provider: ProviderId,
        model_id: impl Into<String>,
        usage: Option<TokenUsage>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            request_tokens: usage.map(|u| u.prompt_tokens),
            response_tokens: usage.map(|u| u.completion_tokens),
            response_time_ms: Some(response_time_ms),
            success: true,
            error_message: None,
        }
    }

    /// Builds a failure event.
    pub fn failure(
        provider: ProviderId,
        model_id: impl Into<String>,
        error_message: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            request_tokens: None,
            response_tokens: None,
            response_time_ms: Some(response_time_ms),
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    /// Total tokens when both sides are known.
    pub fn total_tokens(&self) -> Option<u32> {
        match (self.request_tokens, self.response_tokens) {
            (Some(req), Some(resp)) => Some(req + resp),
            _ => None,
        }
    }
}

// ============================================================================
// Aggregate Views
// ============================================================================

/// All-time summary across every recorded event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Total requests recorded.
    pub total_requests: u64,
    /// Requests that succeeded.
    pub successful_requests: u64,
    /// Success percentage (0-100).
    pub success_rate: f64,
    /// Total tokens across all events.
    pub total_tokens: u64,
    /// Mean response time across events that carried one.
    pub avg_response_time_ms: f64,
    /// Requests in the trailing 24 hours.
    pub requests_24h: u64,
    /// Tokens in the trailing 24 hours.
    pub tokens_24h: u64,
    /// Distinct providers seen.
    pub unique_providers: u64,
    /// Distinct models seen.
    pub unique_models: u64,
}

/// Aggregate usage for one provider over a query window.
///
/// Provider names are plain strings on the way out of storage so that rows
/// for since-removed providers still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUsage {
    /// Provider wire name.
    pub provider: String,
    /// Requests in the window.
    pub total_requests: u64,
    /// Successful requests in the window.
    pub successful_requests: u64,
    /// Failed requests in the window.
    pub failed_requests: u64,
    /// Success percentage (0-100).
    pub success_rate: f64,
    /// Tokens in the window.
    pub total_tokens: u64,
    /// Mean response time in the window.
    pub avg_response_time_ms: f64,
}

/// Aggregate usage for one (provider, model) pair over a query window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Provider wire name.
    pub provider: String,
    /// Model id.
    pub model_id: String,
    /// Uses in the window.
    pub usage_count: u64,
    /// Tokens in the window.
    pub total_tokens: u64,
    /// Mean response time in the window.
    pub avg_response_time_ms: f64,
}
