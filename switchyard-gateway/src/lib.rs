// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Switchyard Gateway
//!
//! The dispatch layer of the Switchyard gateway.
//!
//! [`Dispatcher`] is the single entry point that turns a chat request into
//! a routed provider call plus a recorded outcome: it resolves the provider
//! for a model id through the TTL-governed model cache, times the adapter
//! call, and records a usage event whether the call succeeds, fails, or is
//! cancelled mid-flight.
//!
//! [`ModelCatalog`] supplies the keyword-based categorization, grouping,
//! and search over discovered models.

pub mod catalog;
pub mod dispatcher;

pub use catalog::{Category, ModelCatalog};
pub use dispatcher::{
    CategorizedModel, Dispatcher, ProviderModels, RefreshOutcome, RefreshedProvider,
};
