//! W3C validators: the Nu HTML Checker (`w3c`) and the CSS validator
//! (`w3c-css`). Each is its own adapter so a matrix enables either or both.

use std::time::Instant;

use a11ymatrix_core::{
    Adapter, AdapterError, AdapterResult, AdapterSettings, Capabilities, RawPayload, UnitContext,
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::http::{classify, default_client, json_body};

pub const DEFAULT_ENDPOINT: &str = "https://validator.w3.org/nu/";
pub const DEFAULT_CSS_ENDPOINT: &str = "https://jigsaw.w3.org/css-validator/validator";
const DEFAULT_CSS_PROFILE: &str = "css3";

pub struct W3cAdapter {
    client: Client,
    endpoint: String,
}

impl W3cAdapter {
    pub fn new(settings: &AdapterSettings) -> AdapterResult<Self> {
        Ok(Self::with_client(default_client()?, settings))
    }

    pub fn with_client(client: Client, settings: &AdapterSettings) -> Self {
        Self {
            client,
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }
}

#[async_trait]
impl Adapter for W3cAdapter {
    fn name(&self) -> &str {
        "w3c"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none()
    }

    async fn invoke(&self, ctx: &UnitContext) -> AdapterResult<RawPayload> {
        let budget = ctx.remaining();
        let started = Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("doc", ctx.url.as_str()), ("out", "json")])
            .timeout(budget)
            .send()
            .await
            .map_err(|e| classify(e, budget))?;
        let body = json_body(response, budget).await?;
        debug!(
            url = %ctx.url,
            duration_ms = started.elapsed().as_millis() as u64,
            "validator report received"
        );
        Ok(RawPayload::W3c(body))
    }
}

/// W3C CSS validator (jigsaw). The `profile` option selects the CSS profile.
pub struct CssValidatorAdapter {
    client: Client,
    endpoint: String,
    profile: String,
}

impl CssValidatorAdapter {
    pub fn new(settings: &AdapterSettings) -> AdapterResult<Self> {
        Ok(Self::with_client(default_client()?, settings))
    }

    pub fn with_client(client: Client, settings: &AdapterSettings) -> Self {
        Self {
            client,
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_CSS_ENDPOINT.to_string()),
            profile: settings
                .options
                .get("profile")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_CSS_PROFILE)
                .to_string(),
        }
    }
}

#[async_trait]
impl Adapter for CssValidatorAdapter {
    fn name(&self) -> &str {
        "w3c-css"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none()
    }

    async fn invoke(&self, ctx: &UnitContext) -> AdapterResult<RawPayload> {
        let budget = ctx.remaining();
        let started = Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("uri", ctx.url.as_str()),
                ("profile", self.profile.as_str()),
                ("output", "json"),
            ])
            .timeout(budget)
            .send()
            .await
            .map_err(|e| classify(e, budget))?;
        let body = json_body(response, budget).await?;
        if body.get("cssvalidation").is_none() {
            return Err(AdapterError::InvalidOutput(
                "CSS validator response has no `cssvalidation` block".into(),
            ));
        }
        debug!(
            url = %ctx.url,
            profile = %self.profile,
            duration_ms = started.elapsed().as_millis() as u64,
            "css validator report received"
        );
        Ok(RawPayload::W3cCss(body))
    }
}
