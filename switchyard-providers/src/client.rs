//! Shared HTTP client construction.

use reqwest::Client;
use std::time::Duration;

use crate::error::AdapterError;

/// Default request timeout in seconds. Chat completions can run long.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Builds the reqwest client shared by every adapter.
pub fn build_http_client() -> Result<Client, AdapterError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent(concat!("switchyard/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
