//! Credential health types.
//!
//! The credential records themselves live inside the key rotation manager
//! and are never handed out; these are the read-only views it exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderId;

// ============================================================================
// Credential Status
// ============================================================================

/// Health state of a single credential.
///
/// Exactly one state applies at a time; it is the single source of truth
/// for whether a credential may be served. `RateLimited` always carries a
/// reset time on the owning record, so a lockout without an expiry is
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Usable right now.
    Active,
    /// Locked out until the record's reset time passes.
    RateLimited,
    /// The provider reported an exhausted quota.
    QuotaExceeded,
    /// Demoted after repeated errors; requires operator intervention.
    Invalid,
    /// The secret itself has expired.
    Expired,
    /// Turned off by an operator.
    Disabled,
}

impl CredentialStatus {
    /// Returns true for states a credential can never leave on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Expired | Self::Disabled)
    }
}

// ============================================================================
// Read-only Views
// ============================================================================

/// Read-only view of one credential record. The secret is never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    /// Display name of the credential.
    pub name: String,
    /// Provider this credential belongs to.
    pub provider: ProviderId,
    /// Sort priority within the pool (ascending).
    pub priority: u32,
    /// Current health state.
    pub status: CredentialStatus,
    /// Last time this credential was used (success or failure).
    pub last_used: Option<DateTime<Utc>>,
    /// When a rate-limit lockout expires, if one is in effect.
    pub rate_limit_reset: Option<DateTime<Utc>>,
    /// Consecutive-ish error count (decays on success).
    pub error_count: u32,
    /// Total successful uses.
    pub success_count: u64,
    /// Most recent error message.
    pub last_error: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Summary of one provider's credential pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderKeyStatus {
    /// The provider.
    pub provider: ProviderId,
    /// True iff at least one credential is active or reclaimable right now.
    pub available: bool,
    /// Total credentials in the pool.
    pub total_keys: usize,
    /// Credentials currently usable.
    pub active_keys: usize,
    /// Per-credential detail.
    pub keys: Vec<CredentialSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CredentialStatus::Invalid.is_terminal());
        assert!(CredentialStatus::Disabled.is_terminal());
        assert!(!CredentialStatus::Active.is_terminal());
        assert!(!CredentialStatus::RateLimited.is_terminal());
    }

    #[test]
    fn test_status_serde_names() {
        let s = serde_json::to_string(&CredentialStatus::RateLimited).unwrap();
        assert_eq!(s, "\"rate_limited\"");
        let back: CredentialStatus = serde_json::from_str("\"quota_exceeded\"").unwrap();
        assert_eq!(back, CredentialStatus::QuotaExceeded);
    }
}
