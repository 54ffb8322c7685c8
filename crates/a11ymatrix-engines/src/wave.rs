//! WebAIM WAVE API adapter.
//!
//! One `GET` per unit against the WAVE request endpoint. The API key is read
//! from the environment at invoke time so a missing key fails only the WAVE
//! units, not the run.

use std::time::Instant;

use a11ymatrix_core::{
    Adapter, AdapterError, AdapterResult, AdapterSettings, Capabilities, RawPayload, UnitContext,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::http::{classify, default_client, json_body};

pub const DEFAULT_ENDPOINT: &str = "https://wave.webaim.org/api/request";
pub const DEFAULT_CREDENTIAL_ENV: &str = "WAVE_API_KEY";
/// Report type 3 includes XPath selectors for each item.
const DEFAULT_REPORT_TYPE: &str = "3";

pub struct WaveAdapter {
    client: Client,
    endpoint: String,
    credential_env: String,
    report_type: String,
}

impl WaveAdapter {
    pub fn new(settings: &AdapterSettings) -> AdapterResult<Self> {
        Ok(Self::with_client(default_client()?, settings))
    }

    pub fn with_client(client: Client, settings: &AdapterSettings) -> Self {
        let report_type = match settings.options.get("reporttype") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => DEFAULT_REPORT_TYPE.to_string(),
        };
        Self {
            client,
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            credential_env: settings
                .credential_env
                .clone()
                .unwrap_or_else(|| DEFAULT_CREDENTIAL_ENV.to_string()),
            report_type,
        }
    }

    fn api_key(&self) -> AdapterResult<String> {
        match std::env::var(&self.credential_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AdapterError::MissingCredential(self.credential_env.clone())),
        }
    }
}

/// WAVE answers errors with HTTP 200 and `status.success == false`.
fn check_api_status(body: &Value) -> AdapterResult<()> {
    let status = body.get("status");
    let success = status
        .and_then(|s| s.get("success"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
    if success {
        return Ok(());
    }
    let reason = status
        .and_then(|s| s.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("request rejected");
    Err(AdapterError::InvalidOutput(format!("WAVE API: {reason}")))
}

#[async_trait]
impl Adapter for WaveAdapter {
    fn name(&self) -> &str {
        "wave"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_credential(self.credential_env.as_str())
    }

    async fn invoke(&self, ctx: &UnitContext) -> AdapterResult<RawPayload> {
        let key = self.api_key()?;
        let budget = ctx.remaining();
        let started = Instant::now();
        let viewport = ctx.viewport();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", key.as_str()),
                ("url", ctx.url.as_str()),
                ("reporttype", self.report_type.as_str()),
                ("viewportwidth", &viewport.width.to_string()),
            ])
            .timeout(budget)
            .send()
            .await
            .map_err(|e| classify(e, budget))?;
        let body = json_body(response, budget).await?;
        debug!(
            url = %ctx.url,
            duration_ms = started.elapsed().as_millis() as u64,
            "WAVE report received"
        );
        check_api_status(&body)?;
        Ok(RawPayload::Wave(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_status_failure_is_invalid_output() {
        let body = json!({"status": {"success": false, "error": "Invalid API key"}});
        match check_api_status(&body) {
            Err(AdapterError::InvalidOutput(msg)) => assert!(msg.contains("Invalid API key")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_api_status(&json!({"status": {"success": true}, "categories": {}})).is_ok());
    }

    #[test]
    fn settings_override_defaults() {
        let mut settings = AdapterSettings {
            endpoint: Some("http://127.0.0.1:9/wave".into()),
            credential_env: Some("A11YMATRIX_WAVE_KEY".into()),
            ..AdapterSettings::default()
        };
        settings.options.insert("reporttype".into(), json!(4));
        let adapter = WaveAdapter::with_client(Client::new(), &settings);
        assert_eq!(adapter.endpoint, "http://127.0.0.1:9/wave");
        assert_eq!(adapter.report_type, "4");
        assert_eq!(
            adapter.capabilities().api_credential.as_deref(),
            Some("A11YMATRIX_WAVE_KEY")
        );
    }

    #[test]
    fn missing_key_is_reported_by_variable_name() {
        let settings = AdapterSettings {
            credential_env: Some("A11YMATRIX_TEST_UNSET_WAVE_KEY".into()),
            ..AdapterSettings::default()
        };
        let adapter = WaveAdapter::with_client(Client::new(), &settings);
        assert_eq!(
            adapter.api_key().unwrap_err(),
            AdapterError::MissingCredential("A11YMATRIX_TEST_UNSET_WAVE_KEY".into())
        );
    }
}
