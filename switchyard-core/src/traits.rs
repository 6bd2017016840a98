//! Trait definitions for Switchyard.
//!
//! This module defines the contract every provider integration must satisfy.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{ChatRequest, ChatResponse, ModelDescriptor, ProviderId, ProviderInfo};

/// Contract for one provider integration.
///
/// Implementors are responsible for:
/// - Translating the unified chat vocabulary to the vendor's wire format
/// - Acquiring a credential from the key rotation manager before each call
///   and reporting the outcome back (classifying rate-limit errors against
///   the vendor's error signatures)
/// - Fetching the vendor's model catalog
///
/// The trait is object-safe: the dispatcher holds adapters as
/// `Arc<dyn ProviderAdapter>` and never switches on concrete type.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Returns the provider this adapter integrates.
    fn id(&self) -> ProviderId;

    /// Returns display information for this provider.
    ///
    /// `available` reflects credential pool state at the time of the call.
    async fn info(&self) -> ProviderInfo;

    /// Fetches the provider's current model catalog.
    ///
    /// Returns an empty list, never an error, on transient unavailability —
    /// a provider with no reachable catalog simply routes nothing.
    async fn list_models(&self) -> Vec<ModelDescriptor>;

    /// Executes a chat completion against the provider.
    ///
    /// Must acquire a credential from the key rotation manager, report
    /// success or failure (with rate-limit classification) after the call,
    /// and map the outcome into the gateway error taxonomy.
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError>;

    /// Returns true if the provider currently has a usable credential.
    async fn is_available(&self) -> bool;
}
