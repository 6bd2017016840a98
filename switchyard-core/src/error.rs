//! The gateway error taxonomy.

use thiserror::Error;

use crate::models::ProviderId;

/// Errors surfaced by the gateway core.
///
/// The taxonomy separates routing errors (caller's fault, not retried),
/// upstream failures (absorbed into credential health tracking), and
/// credential exhaustion (service-unavailable, requires a later retry or
/// operator intervention).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Every credential for the provider is exhausted or locked out.
    #[error("No credential available for provider {provider}")]
    NoCredentialAvailable {
        /// The provider whose pool is exhausted.
        provider: ProviderId,
    },

    /// The upstream call hit a rate limit; the credential was quarantined.
    #[error("Provider {provider} rate limited the request")]
    RateLimited {
        /// The provider that rejected the request.
        provider: ProviderId,
    },

    /// A credential was permanently demoted; operator intervention needed.
    #[error("Credential for provider {provider} is invalid")]
    InvalidCredential {
        /// The provider the credential belongs to.
        provider: ProviderId,
    },

    /// No registered provider matches the requested name.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// No registered provider lists the requested model.
    #[error("No provider found for model {0}")]
    ModelNotRoutable(String),

    /// The request itself is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream call failed for a non-rate-limit reason.
    #[error("Provider {provider} request failed: {message}")]
    Upstream {
        /// The provider that failed.
        provider: ProviderId,
        /// Upstream error detail.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persistence operation failed. Non-fatal: in-memory state stays
    /// authoritative until the next successful write.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl GatewayError {
    /// Returns true if the error is the caller's fault (bad model or
    /// provider name, malformed request) rather than a gateway-side failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            GatewayError::ProviderNotFound(_)
                | GatewayError::ModelNotRoutable(_)
                | GatewayError::InvalidRequest(_)
        )
    }
}
