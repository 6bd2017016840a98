//! Credential pools and the key rotation manager.
//!
//! Each provider owns an ordered list of credential records plus a rotation
//! cursor. The manager serves one available credential per acquisition,
//! quarantines rate-limited credentials until their reset time, demotes
//! credentials after repeated errors, and persists the pools to a YAML file
//! wholesale on every mutating key operation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use switchyard_core::{CredentialSnapshot, CredentialStatus, ProviderId, ProviderKeyStatus};

use crate::config::CredentialsConfig;
use crate::error::StoreError;
use crate::persistence::{load_yaml, save_yaml};

/// Error count at which a credential is demoted to `Invalid`.
const INVALID_THRESHOLD: u32 = 5;

// ============================================================================
// Key State
// ============================================================================

/// Internal credential state machine.
///
/// `RateLimited` carries its reset time as data, so a lockout without an
/// expiry cannot exist.
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyState {
    Active,
    RateLimited { reset_at: DateTime<Utc> },
    QuotaExceeded,
    Invalid,
    Expired,
    Disabled,
}

impl KeyState {
    fn status(self) -> CredentialStatus {
        match self {
            Self::Active => CredentialStatus::Active,
            Self::RateLimited { .. } => CredentialStatus::RateLimited,
            Self::QuotaExceeded => CredentialStatus::QuotaExceeded,
            Self::Invalid => CredentialStatus::Invalid,
            Self::Expired => CredentialStatus::Expired,
            Self::Disabled => CredentialStatus::Disabled,
        }
    }

    fn reset_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::RateLimited { reset_at } => Some(reset_at),
            _ => None,
        }
    }

    fn from_persisted(status: CredentialStatus, reset_at: Option<DateTime<Utc>>) -> Self {
        match (status, reset_at) {
            (CredentialStatus::Active, _) => Self::Active,
            (CredentialStatus::RateLimited, Some(reset_at)) => Self::RateLimited { reset_at },
            // A persisted lockout without a reset time has lost its expiry;
            // treat it as reclaimed rather than locking the key out forever.
            (CredentialStatus::RateLimited, None) => Self::Active,
            (CredentialStatus::QuotaExceeded, _) => Self::QuotaExceeded,
            (CredentialStatus::Invalid, _) => Self::Invalid,
            (CredentialStatus::Expired, _) => Self::Expired,
            (CredentialStatus::Disabled, _) => Self::Disabled,
        }
    }
}

// ============================================================================
// Credential Record
// ============================================================================

/// One credential with its health state. Never leaves this module.
#[derive(Debug, Clone)]
struct CredentialRecord {
    secret: String,
    name: String,
    priority: u32,
    state: KeyState,
    last_used: Option<DateTime<Utc>>,
    error_count: u32,
    success_count: u64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl CredentialRecord {
    fn new(secret: String, name: String, priority: u32) -> Self {
        Self {
            secret,
            name,
            priority,
            state: KeyState::Active,
            last_used: None,
            error_count: 0,
            success_count: 0,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    /// True if the record can be served at `now`, counting rate limits whose
    /// window has elapsed as available.
    fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            KeyState::Active => true,
            KeyState::RateLimited { reset_at } => now > reset_at,
            _ => false,
        }
    }

    /// Applies the lazy `RateLimited -> Active` transition when the reset
    /// time has passed.
    fn reclaim_if_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        if let KeyState::RateLimited { reset_at } = self.state {
            if now > reset_at {
                self.state = KeyState::Active;
                return true;
            }
        }
        false
    }

    fn mark_rate_limited(&mut self, reset_at: DateTime<Utc>) {
        self.state = KeyState::RateLimited { reset_at };
    }

    fn mark_failure(&mut self, message: &str, now: DateTime<Utc>) {
        self.error_count += 1;
        self.last_error = Some(message.to_string());
        self.last_used = Some(now);

        if self.error_count >= INVALID_THRESHOLD {
            self.state = KeyState::Invalid;
        }
    }

    fn mark_success(&mut self, now: DateTime<Utc>) {
        self.success_count += 1;
        self.error_count = self.error_count.saturating_sub(1);
        self.last_used = Some(now);
        // An Invalid/Disabled credential is not revived by a stray success.
    }

    fn snapshot(&self, provider: ProviderId) -> CredentialSnapshot {
        CredentialSnapshot {
            name: self.name.clone(),
            provider,
            priority: self.priority,
            status: self.state.status(),
            last_used: self.last_used,
            rate_limit_reset: self.state.reset_at(),
            error_count: self.error_count,
            success_count: self.success_count,
            last_error: self.last_error.clone(),
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// Credential Pool
// ============================================================================

/// Ordered credentials for one provider plus the rotation cursor.
#[derive(Debug, Default)]
struct CredentialPool {
    records: Vec<CredentialRecord>,
    cursor: usize,
}

impl CredentialPool {
    fn sort_by_priority(&mut self) {
        self.records.sort_by_key(|r| r.priority);
    }

    fn advance_cursor(&mut self) {
        if !self.records.is_empty() {
            self.cursor = (self.cursor + 1) % self.records.len();
        }
    }

    fn clamp_cursor(&mut self) {
        if self.records.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor = self.cursor.min(self.records.len() - 1);
        }
    }
}

// ============================================================================
// Persisted File Shape
// ============================================================================

/// On-disk credential file: one section per provider.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    providers: HashMap<ProviderId, ProviderSection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProviderSection {
    keys: Vec<CredentialEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialEntry {
    // Hand-written files may omit name and priority; names are derived
    // from the list position and priority defaults to 1 (sorting is
    // stable, so file order is preserved among equals).
    #[serde(default)]
    name: String,
    key: String,
    #[serde(default = "default_entry_priority")]
    priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<CredentialStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rate_limit_reset: Option<DateTime<Utc>>,
}

fn default_entry_priority() -> u32 {
    1
}

// ============================================================================
// Key Rotation Manager
// ============================================================================

/// A credential handed out by [`KeyRotationManager::acquire`].
///
/// The caller reports the outcome back by secret.
#[derive(Debug, Clone)]
pub struct AcquiredKey {
    /// The secret to authenticate with.
    pub secret: String,
    /// Display name of the credential, for logging.
    pub name: String,
}

/// Internal state for the key rotation manager.
#[derive(Debug, Default)]
struct KeyManagerInner {
    pools: HashMap<ProviderId, CredentialPool>,
}

/// Serves available credentials per provider with round-robin rotation,
/// rate-limit quarantine, and error-based demotion.
pub struct KeyRotationManager {
    inner: RwLock<KeyManagerInner>,
    path: PathBuf,
    config: CredentialsConfig,
}

impl KeyRotationManager {
    /// Loads credential pools from the configured YAML file.
    ///
    /// A missing file starts with empty pools; it is created on the first
    /// mutating key operation.
    pub async fn load(config: &CredentialsConfig) -> Result<Self, StoreError> {
        let path = config.file.clone();
        let mut inner = KeyManagerInner::default();

        if path.exists() {
            let file: CredentialFile = load_yaml(&path).await?;
            for (provider, section) in file.providers {
                let mut pool = CredentialPool::default();
                for (i, entry) in section.keys.into_iter().enumerate() {
                    let mut record = CredentialRecord::new(
                        entry.key,
                        if entry.name.is_empty() {
                            format!("{provider}_key_{}", i + 1)
                        } else {
                            entry.name
                        },
                        entry.priority,
                    );
                    if let Some(status) = entry.status {
                        record.state = KeyState::from_persisted(status, entry.rate_limit_reset);
                    }
                    pool.records.push(record);
                }
                pool.sort_by_priority();
                debug!(provider = %provider, keys = pool.records.len(), "Loaded credential pool");
                inner.pools.insert(provider, pool);
            }
            info!(path = %path.display(), providers = inner.pools.len(), "Loaded credentials");
        } else {
            debug!(path = %path.display(), "Credential file not found, starting empty");
        }

        Ok(Self {
            inner: RwLock::new(inner),
            path,
            config: config.clone(),
        })
    }

    /// Acquires an available credential for a provider.
    ///
    /// Scans the pool starting at the rotation cursor, wrapping once, lazily
    /// reclaiming expired rate limits on the way. The cursor is left pointing
    /// at the returned record, so the next acquisition starts scanning from
    /// there. Returns `None` when the provider has no pool or every
    /// credential is unavailable; the caller must surface that as
    /// provider-unavailable, not retry.
    pub async fn acquire(&self, provider: ProviderId) -> Option<AcquiredKey> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let pool = inner.pools.get_mut(&provider)?;
        if pool.records.is_empty() {
            return None;
        }

        let len = pool.records.len();
        let start = pool.cursor % len;
        for i in 0..len {
            let idx = (start + i) % len;
            let record = &mut pool.records[idx];
            if record.reclaim_if_elapsed(now) {
                debug!(provider = %provider, key = %record.name, "Rate limit window elapsed, key reclaimed");
            }
            if record.state == KeyState::Active {
                pool.cursor = idx;
                return Some(AcquiredKey {
                    secret: record.secret.clone(),
                    name: record.name.clone(),
                });
            }
        }

        None
    }

    /// Records a successful use of a credential.
    ///
    /// Increments the success count, decays the error count by one (floored
    /// at zero), and stamps the last-used time. Does not change status — an
    /// `Invalid` credential is never revived this way.
    pub async fn report_success(&self, provider: ProviderId, secret: &str) {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        if let Some(pool) = inner.pools.get_mut(&provider) {
            if let Some(record) = pool.records.iter_mut().find(|r| r.secret == secret) {
                record.mark_success(now);
            }
        }
    }

    /// Records a failed use of a credential.
    ///
    /// Rate-limit failures quarantine the credential until the provider's
    /// reset window elapses; other failures bump the error count and demote
    /// the credential to `Invalid` at the threshold. Either way the rotation
    /// cursor advances so the failing slot is not offered on the next call.
    pub async fn report_failure(
        &self,
        provider: ProviderId,
        secret: &str,
        message: &str,
        is_rate_limit: bool,
    ) {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let Some(pool) = inner.pools.get_mut(&provider) else {
            return;
        };
        let Some(record) = pool.records.iter_mut().find(|r| r.secret == secret) else {
            return;
        };

        if is_rate_limit {
            let hours = self.config.reset_window_hours(provider);
            let reset_at = now + Duration::hours(i64::from(hours));
            record.mark_rate_limited(reset_at);
            debug!(
                provider = %provider,
                key = %record.name,
                reset_at = %reset_at,
                "Credential rate limited"
            );
        } else {
            record.mark_failure(message, now);
            if record.state == KeyState::Invalid {
                info!(
                    provider = %provider,
                    key = %record.name,
                    errors = record.error_count,
                    "Credential demoted to invalid"
                );
            }
        }

        pool.advance_cursor();
    }

    /// Returns a read-only status snapshot for one provider's pool.
    pub async fn provider_status(&self, provider: ProviderId) -> ProviderKeyStatus {
        let now = Utc::now();
        let inner = self.inner.read().await;
        let Some(pool) = inner.pools.get(&provider) else {
            return ProviderKeyStatus {
                provider,
                available: false,
                total_keys: 0,
                active_keys: 0,
                keys: Vec::new(),
            };
        };

        let active_keys = pool.records.iter().filter(|r| r.is_available_at(now)).count();
        ProviderKeyStatus {
            provider,
            available: active_keys > 0,
            total_keys: pool.records.len(),
            active_keys,
            keys: pool.records.iter().map(|r| r.snapshot(provider)).collect(),
        }
    }

    /// Returns status snapshots for every configured pool.
    pub async fn all_statuses(&self) -> Vec<ProviderKeyStatus> {
        let providers: Vec<ProviderId> = {
            let inner = self.inner.read().await;
            inner.pools.keys().copied().collect()
        };
        let mut statuses = Vec::with_capacity(providers.len());
        for provider in ProviderId::all() {
            if providers.contains(provider) {
                statuses.push(self.provider_status(*provider).await);
            }
        }
        statuses
    }

    /// Proactively reclaims every rate-limited credential whose reset time
    /// has elapsed. Returns the number of credentials reclaimed.
    pub async fn sweep_expired_lockouts(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let mut reclaimed = 0;
        for (provider, pool) in &mut inner.pools {
            for record in &mut pool.records {
                if record.reclaim_if_elapsed(now) {
                    debug!(provider = %provider, key = %record.name, "Sweep reclaimed key");
                    reclaimed += 1;
                }
            }
        }
        reclaimed
    }

    /// Adds a credential to a provider's pool.
    ///
    /// Returns false when the secret already exists in the pool. The pool is
    /// re-sorted by priority and the credential file rewritten.
    pub async fn add_key(
        &self,
        provider: ProviderId,
        secret: impl Into<String>,
        name: Option<String>,
        priority: u32,
    ) -> bool {
        let secret = secret.into();
        let mut inner = self.inner.write().await;
        let pool = inner.pools.entry(provider).or_default();

        if pool.records.iter().any(|r| r.secret == secret) {
            return false;
        }

        let name =
            name.unwrap_or_else(|| format!("{provider}_key_{}", pool.records.len() + 1));
        info!(provider = %provider, key = %name, "Adding credential");
        pool.records.push(CredentialRecord::new(secret, name, priority));
        pool.sort_by_priority();

        self.persist(&inner).await;
        true
    }

    /// Removes a credential from a provider's pool by secret.
    ///
    /// Returns false when the provider or secret is unknown. The rotation
    /// cursor is clamped back into bounds and the credential file rewritten.
    pub async fn remove_key(&self, provider: ProviderId, secret: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(pool) = inner.pools.get_mut(&provider) else {
            return false;
        };

        let before = pool.records.len();
        pool.records.retain(|r| r.secret != secret);
        if pool.records.len() == before {
            return false;
        }
        pool.clamp_cursor();
        info!(provider = %provider, "Removed credential");

        self.persist(&inner).await;
        true
    }

    /// Rewrites the credential file from current in-memory state.
    ///
    /// Persistence failures are logged and swallowed; in-memory state stays
    /// authoritative until the next successful write.
    async fn persist(&self, inner: &KeyManagerInner) {
        let mut file = CredentialFile::default();
        for (provider, pool) in &inner.pools {
            let section = ProviderSection {
                keys: pool
                    .records
                    .iter()
                    .map(|r| CredentialEntry {
                        name: r.name.clone(),
                        key: r.secret.clone(),
                        priority: r.priority,
                        status: Some(r.state.status()),
                        rate_limit_reset: r.state.reset_at(),
                    })
                    .collect(),
            };
            file.providers.insert(*provider, section);
        }

        if let Err(e) = save_yaml(&self.path, &file).await {
            warn!(path = %self.path.display(), error = %e, "Failed to persist credentials");
        }
    }

    /// Backdates or clears a credential's rate-limit reset, for tests that
    /// need to step past a lockout window without sleeping.
    #[cfg(test)]
    async fn force_reset_time(&self, provider: ProviderId, secret: &str, reset_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if let Some(pool) = inner.pools.get_mut(&provider) {
            if let Some(record) = pool.records.iter_mut().find(|r| r.secret == secret) {
                record.state = KeyState::RateLimited { reset_at };
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> CredentialsConfig {
        CredentialsConfig {
            file: dir.path().join("credentials.yaml"),
            ..CredentialsConfig::default()
        }
    }

    async fn manager_with_keys(
        dir: &tempfile::TempDir,
        provider: ProviderId,
        secrets: &[&str],
    ) -> KeyRotationManager {
        let manager = KeyRotationManager::load(&test_config(dir)).await.unwrap();
        for (i, secret) in secrets.iter().enumerate() {
            assert!(manager.add_key(provider, *secret, None, (i + 1) as u32).await);
        }
        manager
    }

    #[tokio::test]
    async fn test_acquire_unknown_provider_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyRotationManager::load(&test_config(&dir)).await.unwrap();
        assert!(manager.acquire(ProviderId::OpenAi).await.is_none());
    }

    #[tokio::test]
    async fn test_acquire_is_stable_until_failure() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1", "k2", "k3"]).await;

        // The cursor stays on a healthy key across calls.
        for _ in 0..3 {
            assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "k1");
        }

        // A failure advances the cursor past the failing slot.
        manager
            .report_failure(ProviderId::OpenAi, "k1", "boom", false)
            .await;
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "k2");
    }

    #[tokio::test]
    async fn test_single_active_credential_always_served() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1", "k2", "k3"]).await;

        // Lock out everything but k2.
        manager.report_failure(ProviderId::OpenAi, "k1", "429", true).await;
        manager.report_failure(ProviderId::OpenAi, "k3", "429", true).await;

        for _ in 0..5 {
            let acquired = manager.acquire(ProviderId::OpenAi).await.unwrap();
            assert_eq!(acquired.secret, "k2");
        }
    }

    #[tokio::test]
    async fn test_rate_limited_key_skipped_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1", "k2"]).await;

        manager.report_failure(ProviderId::OpenAi, "k1", "429", true).await;
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "k2");

        // Step the clock past the window by backdating the reset time.
        manager
            .force_reset_time(ProviderId::OpenAi, "k1", Utc::now() - Duration::seconds(1))
            .await;

        // k1 is eligible again; the cursor sits on k2, and k1 is reached on
        // wrap-around once k2 is taken out.
        manager.report_failure(ProviderId::OpenAi, "k2", "429", true).await;
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "k1");
    }

    #[tokio::test]
    async fn test_five_failures_demote_to_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1"]).await;

        for _ in 0..INVALID_THRESHOLD {
            manager
                .report_failure(ProviderId::OpenAi, "k1", "bad gateway", false)
                .await;
        }

        assert!(manager.acquire(ProviderId::OpenAi).await.is_none());
        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.keys[0].status, CredentialStatus::Invalid);
        assert_eq!(status.keys[0].error_count, 5);
        assert_eq!(status.keys[0].last_error.as_deref(), Some("bad gateway"));
    }

    #[tokio::test]
    async fn test_success_does_not_revive_invalid_key() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1"]).await;

        for _ in 0..INVALID_THRESHOLD {
            manager.report_failure(ProviderId::OpenAi, "k1", "err", false).await;
        }
        manager.report_success(ProviderId::OpenAi, "k1").await;

        assert!(manager.acquire(ProviderId::OpenAi).await.is_none());
        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.keys[0].status, CredentialStatus::Invalid);
        // The success still decayed the error count.
        assert_eq!(status.keys[0].error_count, 4);
    }

    #[tokio::test]
    async fn test_success_decays_error_count() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1"]).await;

        manager.report_failure(ProviderId::OpenAi, "k1", "err", false).await;
        manager.report_failure(ProviderId::OpenAi, "k1", "err", false).await;
        manager.report_success(ProviderId::OpenAi, "k1").await;

        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.keys[0].error_count, 1);
        assert_eq!(status.keys[0].success_count, 1);

        // Floor at zero.
        manager.report_success(ProviderId::OpenAi, "k1").await;
        manager.report_success(ProviderId::OpenAi, "k1").await;
        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.keys[0].error_count, 0);
    }

    #[tokio::test]
    async fn test_sweep_reclaims_expired_lockouts() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1", "k2"]).await;

        manager.report_failure(ProviderId::OpenAi, "k1", "429", true).await;
        manager
            .force_reset_time(ProviderId::OpenAi, "k1", Utc::now() - Duration::seconds(1))
            .await;

        assert_eq!(manager.sweep_expired_lockouts().await, 1);
        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.keys[0].status, CredentialStatus::Active);

        // Nothing left to reclaim.
        assert_eq!(manager.sweep_expired_lockouts().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_add_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1"]).await;
        assert!(!manager.add_key(ProviderId::OpenAi, "k1", None, 2).await);
        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.total_keys, 1);
    }

    #[tokio::test]
    async fn test_remove_key_clamps_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_keys(&dir, ProviderId::OpenAi, &["k1", "k2", "k3"]).await;

        // Move the cursor to the last slot.
        manager.report_failure(ProviderId::OpenAi, "k1", "err", false).await;
        manager.report_failure(ProviderId::OpenAi, "k2", "err", false).await;
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "k3");

        assert!(manager.remove_key(ProviderId::OpenAi, "k3").await);
        assert!(manager.remove_key(ProviderId::OpenAi, "k2").await);
        // Cursor clamped; the remaining key is still reachable.
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "k1");

        assert!(!manager.remove_key(ProviderId::OpenAi, "nope").await);
    }

    #[tokio::test]
    async fn test_priority_orders_pool() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyRotationManager::load(&test_config(&dir)).await.unwrap();
        manager.add_key(ProviderId::OpenAi, "low", Some("low".into()), 9).await;
        manager.add_key(ProviderId::OpenAi, "high", Some("high".into()), 1).await;

        // Highest priority (lowest number) is served first.
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "high");
    }

    #[tokio::test]
    async fn test_load_minimal_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        tokio::fs::write(
            &config.file,
            "providers:\n  openai:\n    keys:\n      - key: sk-one\n      - key: sk-two\n",
        )
        .await
        .unwrap();

        let manager = KeyRotationManager::load(&config).await.unwrap();
        let status = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(status.total_keys, 2);
        assert!(status.available);
        // Names derive from position, priorities default to 1, and stable
        // sorting preserves file order.
        assert_eq!(status.keys[0].name, "openai_key_1");
        assert_eq!(status.keys[1].name, "openai_key_2");
        assert_eq!(manager.acquire(ProviderId::OpenAi).await.unwrap().secret, "sk-one");
    }

    #[tokio::test]
    async fn test_credential_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        {
            let manager = KeyRotationManager::load(&config).await.unwrap();
            manager
                .add_key(ProviderId::OpenAi, "s1", Some("primary".into()), 1)
                .await;
            manager.add_key(ProviderId::Gemini, "s2", None, 1).await;
            for _ in 0..INVALID_THRESHOLD {
                manager.report_failure(ProviderId::Gemini, "s2", "err", false).await;
            }
            // Status changes are captured by the next mutating key op.
            manager.add_key(ProviderId::Gemini, "s3", None, 2).await;
        }

        let manager = KeyRotationManager::load(&config).await.unwrap();
        let openai = manager.provider_status(ProviderId::OpenAi).await;
        assert_eq!(openai.total_keys, 1);
        assert_eq!(openai.keys[0].name, "primary");

        let gemini = manager.provider_status(ProviderId::Gemini).await;
        assert_eq!(gemini.total_keys, 2);
        let invalid = gemini.keys.iter().find(|k| k.name == "gemini_key_1").unwrap();
        assert_eq!(invalid.status, CredentialStatus::Invalid);
        assert_eq!(manager.acquire(ProviderId::Gemini).await.unwrap().secret, "s3");
    }
}
