//! File persistence helpers.
//!
//! Handles loading and saving state to disk with proper security.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/Switchyard`
/// - Linux: `~/.config/switchyard`
/// - Windows: `%APPDATA%\Switchyard`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support").join("Switchyard"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("switchyard"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default data directory (cache file, statistics database).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("switchyard"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Returns the default gateway configuration file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

/// Returns the default credential file path.
pub fn default_credentials_path() -> PathBuf {
    default_config_dir().join("credentials.yaml")
}

/// Returns the default model cache file path.
pub fn default_cache_path() -> PathBuf {
    default_data_dir().join("models_cache.json")
}

/// Returns the default statistics database path.
pub fn default_statistics_path() -> PathBuf {
    default_data_dir().join("statistics.db")
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive file permissions (0o600) on Unix systems.
///
/// Files written here can contain credential secrets, so they must only be
/// readable by the owner.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path).await?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600); // Owner read/write only
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0600", "Set restrictive permissions");
    Ok(())
}

/// Sets restrictive directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path).await?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o700); // Owner read/write/execute only
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0700", "Set restrictive directory permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates parent directories with restrictive permissions.
async fn create_secure_parent_dirs(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            debug!(path = %parent.display(), "Creating secure directory");
            tokio::fs::create_dir_all(parent).await?;
            set_restrictive_dir_permissions(parent).await?;
        }
    }
    Ok(())
}

/// Writes serialized content atomically (temp file + rename) and applies
/// restrictive permissions on Unix.
async fn write_atomic(path: &Path, content: &str) -> Result<(), StoreError> {
    create_secure_parent_dirs(path).await?;

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, content).await?;
    tokio::fs::rename(&temp_path, path).await?;

    set_restrictive_permissions(path).await?;
    Ok(())
}

/// Saves data to a JSON file with secure permissions.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");
    let json = serde_json::to_string_pretty(data)?;
    write_atomic(path, &json).await?;
    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");
    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

/// Saves data to a YAML file with secure permissions.
pub async fn save_yaml<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving YAML file");
    let yaml = serde_yaml::to_string(data)?;
    write_atomic(path, &yaml).await?;
    debug!(path = %path.display(), "YAML file saved");
    Ok(())
}

/// Loads data from a YAML file.
pub async fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading YAML file");
    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_yaml::from_str(&content)?;
    Ok(data)
}

/// Loads data from a JSON file, returning default if missing or unreadable.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(e) => {
            if !matches!(e, StoreError::Io(_)) {
                warn!(path = %path.display(), error = %e, "Failed to load, using defaults");
            }
            T::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_dir() {
        let path = default_config_dir();
        assert!(!path.as_os_str().is_empty());
    }

    #[test]
    fn test_default_paths_have_expected_names() {
        assert!(default_credentials_path().ends_with("credentials.yaml"));
        assert!(default_cache_path().ends_with("models_cache.json"));
        assert!(default_statistics_path().ends_with("statistics.db"));
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("data.json");

        save_json(&path, &vec![1u32, 2, 3]).await.unwrap();
        let back: Vec<u32> = load_json(&path).await.unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_yaml_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("data.yaml");

        save_yaml(&path, &("a".to_string(), 1u32)).await.unwrap();
        let back: (String, u32) = load_yaml(&path).await.unwrap();
        assert_eq!(back, ("a".to_string(), 1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("secret.json");

        save_json(&path, &"shh").await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "File should have 0600 permissions");
    }

    #[tokio::test]
    async fn test_load_json_or_default_on_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent.json");
        let value: Vec<u32> = load_json_or_default(&path).await;
        assert!(value.is_empty());
    }
}
