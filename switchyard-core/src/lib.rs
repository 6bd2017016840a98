// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Switchyard Core
//!
//! Core types, models, and traits for the Switchyard gateway.
//!
//! This crate provides the foundational abstractions used across all other
//! Switchyard crates, including:
//!
//! - Domain models (providers, models, chat requests, credentials, usage)
//! - The gateway error taxonomy
//! - The [`ProviderAdapter`] trait that every provider integration implements
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderId`] - Enum of all supported providers
//! - [`ProviderInfo`] - Provider display info and availability
//!
//! ### Model & Chat Types
//! - [`ModelDescriptor`] - One entry in a provider's model catalog
//! - [`ChatRequest`] / [`ChatResponse`] - The unified chat vocabulary
//! - [`TokenUsage`] - Token accounting attached to a response
//!
//! ### Credential Types
//! - [`CredentialStatus`] - Health state of a single credential
//! - [`CredentialSnapshot`] - Read-only view of a credential record
//! - [`ProviderKeyStatus`] - Per-provider credential pool summary
//!
//! ### Usage Types
//! - [`UsageEvent`] - One recorded request outcome
//! - [`UsageSummary`] / [`ProviderUsage`] / [`ModelUsage`] - Aggregate views

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::GatewayError;

// Re-export all model types
pub use models::{
    // Chat types
    ChatMessage,
    ChatRequest,
    ChatResponse,
    TokenUsage,
    // Credential types
    CredentialSnapshot,
    CredentialStatus,
    ProviderKeyStatus,
    // Model catalog
    ModelDescriptor,
    // Provider types
    ProviderId,
    ProviderInfo,
    // Usage types
    ModelUsage,
    ProviderUsage,
    UsageEvent,
    UsageSummary,
};

// Re-export traits
pub use traits::ProviderAdapter;
