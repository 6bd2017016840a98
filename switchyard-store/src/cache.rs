//! TTL-bound model catalog cache.
//!
//! Maps provider -> discovered model list with a per-entry time-to-live.
//! The full cache is rewritten to a JSON file on every mutation, before the
//! mutating call returns, so a successful catalog fetch survives a crash.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use switchyard_core::{ModelDescriptor, ProviderId};

use crate::config::CacheConfig;
use crate::persistence::{load_json, save_json};

// ============================================================================
// Persisted Shape
// ============================================================================

/// One cached catalog with its fetch timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    models: Vec<ModelDescriptor>,
    cached_at: DateTime<Utc>,
}

/// On-disk cache file shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    last_updated: Option<DateTime<Utc>>,
    providers: HashMap<ProviderId, CacheEntry>,
}

// ============================================================================
// Cache Info
// ============================================================================

/// Read-only cache diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Entry time-to-live in hours.
    pub ttl_hours: u32,
    /// Most recent entry timestamp.
    pub last_updated: Option<DateTime<Utc>>,
    /// True when no live (unexpired) entry remains.
    pub is_expired: bool,
    /// Number of providers with an entry.
    pub provider_count: usize,
    /// Total models across all entries.
    pub total_model_count: usize,
}

// ============================================================================
// Model Cache
// ============================================================================

/// TTL-governed store of discovered model catalogs.
pub struct ModelCache {
    inner: RwLock<HashMap<ProviderId, CacheEntry>>,
    path: PathBuf,
    enabled: bool,
    ttl_hours: u32,
}

impl ModelCache {
    /// Loads the cache from its configured file.
    ///
    /// Never fails: a missing or corrupt file (or the force-refresh flag)
    /// starts the cache empty, so every first read is a miss.
    pub async fn load(config: &CacheConfig) -> Self {
        let mut entries = HashMap::new();

        if config.enabled && !config.force_refresh_on_startup {
            match load_json::<CacheFile>(&config.cache_file).await {
                Ok(file) => {
                    entries = file.providers;
                    info!(
                        path = %config.cache_file.display(),
                        providers = entries.len(),
                        "Loaded model cache"
                    );
                }
                Err(e) => {
                    if config.cache_file.exists() {
                        warn!(path = %config.cache_file.display(), error = %e, "Failed to load model cache, starting empty");
                    } else {
                        debug!(path = %config.cache_file.display(), "No model cache file, starting empty");
                    }
                }
            }
        } else if config.force_refresh_on_startup {
            debug!("Force refresh on startup set, discarding persisted cache");
        }

        Self {
            inner: RwLock::new(entries),
            path: config.cache_file.clone(),
            enabled: config.enabled,
            ttl_hours: config.ttl_hours,
        }
    }

    fn is_entry_live(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.cached_at + Duration::hours(i64::from(self.ttl_hours)) > now
    }

    /// Returns the cached model list for a provider, or `None` when caching
    /// is disabled, the entry is absent, or its TTL has elapsed.
    pub async fn get(&self, provider: ProviderId) -> Option<Vec<ModelDescriptor>> {
        if !self.enabled {
            return None;
        }
        let now = Utc::now();
        let inner = self.inner.read().await;
        let entry = inner.get(&provider)?;
        if self.is_entry_live(entry, now) {
            Some(entry.models.clone())
        } else {
            debug!(provider = %provider, "Cache entry expired");
            None
        }
    }

    /// Replaces a provider's entry and persists the full cache before
    /// returning. Persistence failures are logged and non-fatal.
    pub async fn put(&self, provider: ProviderId, models: Vec<ModelDescriptor>) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.write().await;
        debug!(provider = %provider, models = models.len(), "Caching model catalog");
        inner.insert(
            provider,
            CacheEntry {
                models,
                cached_at: Utc::now(),
            },
        );
        self.persist(&inner).await;
    }

    /// Removes one provider's entry, or every entry when `provider` is
    /// `None`, then persists.
    pub async fn invalidate(&self, provider: Option<ProviderId>) {
        let mut inner = self.inner.write().await;
        match provider {
            Some(p) => {
                inner.remove(&p);
                debug!(provider = %p, "Invalidated cache entry");
            }
            None => {
                inner.clear();
                debug!("Invalidated entire model cache");
            }
        }
        self.persist(&inner).await;
    }

    /// Returns cache diagnostics.
    pub async fn info(&self) -> CacheInfo {
        let now = Utc::now();
        let inner = self.inner.read().await;
        let last_updated = inner.values().map(|e| e.cached_at).max();
        let is_expired = !inner.values().any(|e| self.is_entry_live(e, now));

        CacheInfo {
            enabled: self.enabled,
            ttl_hours: self.ttl_hours,
            last_updated,
            is_expired,
            provider_count: inner.len(),
            total_model_count: inner.values().map(|e| e.models.len()).sum(),
        }
    }

    async fn persist(&self, entries: &HashMap<ProviderId, CacheEntry>) {
        let file = CacheFile {
            last_updated: entries.values().map(|e| e.cached_at).max(),
            providers: entries.clone(),
        };
        if let Err(e) = save_json(&self.path, &file).await {
            warn!(path = %self.path.display(), error = %e, "Failed to persist model cache");
        }
    }

    /// Backdates an entry's fetch timestamp, for tests that need to step
    /// past the TTL without sleeping.
    #[cfg(test)]
    async fn backdate(&self, provider: ProviderId, cached_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.get_mut(&provider) {
            entry.cached_at = cached_at;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> CacheConfig {
        CacheConfig {
            cache_file: dir.path().join("models_cache.json"),
            ttl_hours: 1,
            ..CacheConfig::default()
        }
    }

    fn models(ids: &[&str]) -> Vec<ModelDescriptor> {
        ids.iter().map(|id| ModelDescriptor::new(*id, *id)).collect()
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::load(&test_config(&dir)).await;

        cache.put(ProviderId::OpenAi, models(&["m1", "m2"])).await;
        let got = cache.get(ProviderId::OpenAi).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].id, "m1");
    }

    #[tokio::test]
    async fn test_get_after_ttl_elapses_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::load(&test_config(&dir)).await;

        cache.put(ProviderId::OpenAi, models(&["m1"])).await;

        // 30 minutes in: still live.
        cache
            .backdate(ProviderId::OpenAi, Utc::now() - Duration::minutes(30))
            .await;
        assert!(cache.get(ProviderId::OpenAi).await.is_some());

        // 61 minutes in: expired.
        cache
            .backdate(ProviderId::OpenAi, Utc::now() - Duration::minutes(61))
            .await;
        assert!(cache.get(ProviderId::OpenAi).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_single_provider_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::load(&test_config(&dir)).await;

        cache.put(ProviderId::OpenAi, models(&["m1"])).await;
        cache.put(ProviderId::Gemini, models(&["g1"])).await;

        cache.invalidate(Some(ProviderId::OpenAi)).await;
        assert!(cache.get(ProviderId::OpenAi).await.is_none());
        assert!(cache.get(ProviderId::Gemini).await.is_some());

        cache.invalidate(None).await;
        assert!(cache.get(ProviderId::Gemini).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            enabled: false,
            ..test_config(&dir)
        };
        let cache = ModelCache::load(&config).await;

        cache.put(ProviderId::OpenAi, models(&["m1"])).await;
        assert!(cache.get(ProviderId::OpenAi).await.is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        {
            let cache = ModelCache::load(&config).await;
            cache.put(ProviderId::OpenAi, models(&["m1"])).await;
        }

        let cache = ModelCache::load(&config).await;
        let got = cache.get(ProviderId::OpenAi).await.unwrap();
        assert_eq!(got[0].id, "m1");
    }

    #[tokio::test]
    async fn test_force_refresh_on_startup_discards_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        {
            let cache = ModelCache::load(&config).await;
            cache.put(ProviderId::OpenAi, models(&["m1"])).await;
        }

        let forced = CacheConfig {
            force_refresh_on_startup: true,
            ..config
        };
        let cache = ModelCache::load(&forced).await;
        assert!(cache.get(ProviderId::OpenAi).await.is_none());

        // Entries written after startup are readable as usual.
        cache.put(ProviderId::OpenAi, models(&["m2"])).await;
        assert!(cache.get(ProviderId::OpenAi).await.is_some());
    }

    #[tokio::test]
    async fn test_info_reports_counts_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::load(&test_config(&dir)).await;

        let info = cache.info().await;
        assert!(info.is_expired);
        assert_eq!(info.provider_count, 0);

        cache.put(ProviderId::OpenAi, models(&["m1", "m2"])).await;
        cache.put(ProviderId::Gemini, models(&["g1"])).await;

        let info = cache.info().await;
        assert!(info.enabled);
        assert!(!info.is_expired);
        assert_eq!(info.ttl_hours, 1);
        assert_eq!(info.provider_count, 2);
        assert_eq!(info.total_model_count, 3);
        assert!(info.last_updated.is_some());
    }
}
