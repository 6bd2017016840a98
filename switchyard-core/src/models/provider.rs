//! Provider-related types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Provider Id
// ============================================================================

/// Supported provider integrations.
///
/// The order of [`ProviderId::all`] is the canonical registration order: it
/// fixes the scan order for model resolution, so the first provider that
/// lists a model id wins ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// OpenAI
    OpenAi,
    /// Google Gemini
    Gemini,
    /// Cody.su
    Cody,
    /// OpenRouter
    OpenRouter,
}

impl ProviderId {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Google Gemini",
            Self::Cody => "Cody.su",
            Self::OpenRouter => "OpenRouter",
        }
    }

    /// Returns the wire name for this provider (lowercase, no spaces).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Cody => "cody",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Returns all provider ids in canonical registration order.
    pub fn all() -> &'static [ProviderId] {
        &[Self::OpenAi, Self::Gemini, Self::Cody, Self::OpenRouter]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "cody" => Ok(Self::Cody),
            "openrouter" => Ok(Self::OpenRouter),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized provider name.
#[derive(Debug, Clone)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

// ============================================================================
// Provider Info
// ============================================================================

/// Display information and availability for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider identifier.
    pub id: ProviderId,
    /// Human-readable name.
    pub display_name: String,
    /// Short description of the integration.
    pub description: String,
    /// Whether the provider is enabled in configuration.
    pub enabled: bool,
    /// Whether the provider currently has a usable credential.
    pub available: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for id in ProviderId::all() {
            let parsed: ProviderId = id.as_str().parse().unwrap();
            assert_eq!(parsed, *id);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<ProviderId>().unwrap(), ProviderId::OpenAi);
        assert!("mystery".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ProviderId::OpenRouter).unwrap();
        assert_eq!(json, "\"openrouter\"");
    }

    #[test]
    fn test_canonical_order_starts_with_openai() {
        assert_eq!(ProviderId::all()[0], ProviderId::OpenAi);
    }
}
