//! Model catalog types.

use serde::{Deserialize, Serialize};

/// One entry in a provider's model catalog.
///
/// Optional fields are absent when the provider does not publish them;
/// costs are USD per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier as the provider knows it.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Short description, if the provider publishes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Context window size in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
    /// Input cost per token in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cost_per_token: Option<f64>,
    /// Output cost per token in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_cost_per_token: Option<f64>,
    /// Whether the model supports streamed responses.
    #[serde(default = "default_true")]
    pub supports_streaming: bool,
    /// Whether the model supports function/tool calling.
    #[serde(default)]
    pub supports_function_calling: bool,
}

fn default_true() -> bool {
    true
}

impl ModelDescriptor {
    /// Creates a descriptor with only an id and name; every optional field
    /// starts unset, streaming defaults to supported.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            context_length: None,
            input_cost_per_token: None,
            output_cost_per_token: None,
            supports_streaming: true,
            supports_function_calling: false,
        }
    }
}
