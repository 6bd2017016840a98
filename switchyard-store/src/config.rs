//! Gateway configuration.
//!
//! Loaded from a YAML file; every field has a serde default so a partial
//! (or missing) file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use switchyard_core::ProviderId;

use crate::error::StoreError;
use crate::persistence::{default_cache_path, default_credentials_path, default_statistics_path};

// ============================================================================
// Top-level Configuration
// ============================================================================

/// Full gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Per-provider settings.
    pub providers: HashMap<ProviderId, ProviderSettings>,
    /// Credential file and reset-window settings.
    pub credentials: CredentialsConfig,
    /// Model cache settings.
    pub models_cache: CacheConfig,
    /// Usage statistics settings.
    pub statistics: StatisticsConfig,
    /// Keyword categories for the model catalog, keyed by category id.
    pub model_filters: HashMap<String, CategoryConfig>,
}

impl GatewayConfig {
    /// Loads configuration from a YAML file.
    ///
    /// A missing file yields the default configuration; a malformed file is
    /// an error (silently ignoring operator config would be worse than
    /// failing startup).
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = serde_yaml::from_str(&content)?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Returns whether a provider is enabled (default: true when absent).
    pub fn is_provider_enabled(&self, id: ProviderId) -> bool {
        self.providers.get(&id).map_or(true, |p| p.enabled)
    }

    /// Returns the settings for a provider, or defaults when absent.
    pub fn provider_settings(&self, id: ProviderId) -> ProviderSettings {
        self.providers.get(&id).cloned().unwrap_or_default()
    }
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Settings for one provider integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Whether the provider participates in routing.
    pub enabled: bool,
    /// Override for the provider's API base URL.
    pub base_url: Option<String>,
    /// Fetch the model catalog from the provider's API (vs. the adapter's
    /// built-in fallback list, for providers that have one).
    pub fetch_models_dynamically: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            fetch_models_dynamically: true,
        }
    }
}

/// Credential file and rate-limit reset-window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Path to the YAML credential file.
    pub file: PathBuf,
    /// Rate-limit reset window in hours, per provider.
    pub reset_hours: HashMap<ProviderId, u32>,
    /// Reset window for providers without an explicit entry.
    pub default_reset_hours: u32,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            file: default_credentials_path(),
            reset_hours: HashMap::new(),
            default_reset_hours: 24,
        }
    }
}

impl CredentialsConfig {
    /// Returns the reset window for a provider in hours.
    pub fn reset_window_hours(&self, id: ProviderId) -> u32 {
        self.reset_hours
            .get(&id)
            .copied()
            .unwrap_or(self.default_reset_hours)
    }
}

/// Model cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled at all.
    pub enabled: bool,
    /// Entry time-to-live in hours.
    pub ttl_hours: u32,
    /// Path to the cache file.
    pub cache_file: PathBuf,
    /// Discard persisted entries on startup so the first read refetches.
    pub force_refresh_on_startup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 24,
            cache_file: default_cache_path(),
            force_refresh_on_startup: false,
        }
    }
}

/// Usage statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Whether usage recording is enabled.
    pub enabled: bool,
    /// Path to the SQLite database file.
    pub database_file: PathBuf,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_file: default_statistics_path(),
        }
    }
}

/// One keyword category for the model catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Display name; derived from the category id when absent.
    pub display_name: Option<String>,
    /// Keywords matched (case-insensitively) against model id, name, and
    /// description.
    pub keywords: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig::load_from(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(config.models_cache.enabled);
        assert_eq!(config.credentials.default_reset_hours, 24);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  port: 9001\nproviders:\n  gemini:\n    enabled: false\n",
        )
        .unwrap();

        let config = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.is_provider_enabled(ProviderId::Gemini));
        assert!(config.is_provider_enabled(ProviderId::OpenAi));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: [not, a, map]").unwrap();
        assert!(GatewayConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_reset_window_falls_back_to_default() {
        let mut config = CredentialsConfig::default();
        config.reset_hours.insert(ProviderId::Gemini, 6);
        assert_eq!(config.reset_window_hours(ProviderId::Gemini), 6);
        assert_eq!(config.reset_window_hours(ProviderId::OpenAi), 24);
    }
}
