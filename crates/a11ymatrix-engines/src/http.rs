//! Shared HTTP plumbing for engine adapters and the page provider.

use std::time::Duration;

use a11ymatrix_core::{AdapterError, AdapterResult};
use reqwest::{Client, Response};

pub const USER_AGENT: &str = concat!("a11ymatrix/", env!("CARGO_PKG_VERSION"));

/// Client used when the caller does not supply one.
pub fn default_client() -> AdapterResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AdapterError::Unsupported(format!("HTTP client: {e}")))
}

/// Classify a transport error for the retry policy.
pub fn classify(err: reqwest::Error, budget: Duration) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout {
            elapsed_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }
    } else if let Some(status) = err.status() {
        AdapterError::HttpStatus {
            status: status.as_u16(),
        }
    } else if err.is_decode() {
        AdapterError::InvalidOutput(err.to_string())
    } else if err.is_builder() {
        AdapterError::MalformedUrl(err.to_string())
    } else {
        AdapterError::Network(err.to_string())
    }
}

/// Turn a non-success status into `HttpStatus`.
pub fn check_status(response: Response) -> AdapterResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AdapterError::HttpStatus {
            status: status.as_u16(),
        })
    }
}

/// Body of a successful response parsed as JSON.
pub async fn json_body(response: Response, budget: Duration) -> AdapterResult<serde_json::Value> {
    let response = check_status(response)?;
    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| classify(e, budget))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("a11ymatrix/"));
    }

    #[test]
    fn default_client_builds() {
        assert!(default_client().is_ok());
    }
}
