// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Switchyard Store
//!
//! State management for the Switchyard gateway.
//!
//! This crate provides:
//!
//! - **[`KeyRotationManager`]**: per-provider credential pools with health
//!   tracking, round-robin rotation, and self-healing rate-limit lockouts
//! - **[`ModelCache`]**: TTL-bound model catalog cache persisted to JSON
//! - **[`StatisticsStore`]**: SQLite-backed usage event log with daily
//!   rollups and aggregate queries
//! - **[`GatewayConfig`]**: YAML configuration with serde defaults
//! - **Persistence**: atomic file I/O helpers with restrictive permissions
//!
//! ## Usage
//!
//! ```ignore
//! use switchyard_store::{GatewayConfig, KeyRotationManager, ModelCache, StatisticsStore};
//! use switchyard_core::ProviderId;
//!
//! let config = GatewayConfig::load_from(&path)?;
//! let keys = KeyRotationManager::load(&config.credentials).await?;
//!
//! if let Some(acquired) = keys.acquire(ProviderId::OpenAi).await {
//!     // ... call the provider ...
//!     keys.report_success(ProviderId::OpenAi, &acquired.secret).await;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod persistence;
pub mod stats;

pub use cache::{CacheInfo, ModelCache};
pub use config::{
    CacheConfig, CategoryConfig, CredentialsConfig, GatewayConfig, ProviderSettings, ServerConfig,
    StatisticsConfig,
};
pub use error::StoreError;
pub use keys::{AcquiredKey, KeyRotationManager};
pub use persistence::{
    default_cache_path, default_config_dir, default_config_path, default_credentials_path,
    default_data_dir, default_statistics_path, load_json, load_yaml, save_json, save_yaml,
};
pub use stats::StatisticsStore;
