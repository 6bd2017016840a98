//! Shared handler state.

use std::sync::Arc;

use switchyard_gateway::Dispatcher;
use switchyard_store::{KeyRotationManager, ModelCache, StatisticsStore};

/// Handles injected into every route handler.
///
/// Everything is constructed once at startup and shared by `Arc`; there is
/// no ambient global manager.
#[derive(Clone)]
pub struct AppState {
    /// Request orchestration.
    pub dispatcher: Arc<Dispatcher>,
    /// Credential pools.
    pub keys: Arc<KeyRotationManager>,
    /// Model catalog cache.
    pub cache: Arc<ModelCache>,
    /// Usage statistics.
    pub stats: Arc<StatisticsStore>,
}
