//! Adapter contract.
//!
//! Every engine sits behind [`Adapter`]: one stateless `invoke` per
//! execution unit, returning a tagged [`RawPayload`] or an [`AdapterError`].
//! Adapters are collected in an [`AdapterRegistry`] that the caller builds and
//! hands to the scheduler for the lifetime of one run.

pub mod session;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::domain::error::{AdapterError, AdapterResult};
use crate::domain::model::{ExecutionUnit, RawPayload, ViewportProfile};

pub use session::{
    BrowserProvider, BrowserSession, ElementBox, PageSnapshot, SessionLease, SessionPool,
};

/// External resources an adapter needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Needs a browser (or page provider) session for the unit's group.
    pub browser_session: bool,
    /// Environment variable holding an API credential.
    pub api_credential: Option<String>,
    /// External program the adapter spawns.
    pub external_process: Option<String>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_browser_session(mut self) -> Self {
        self.browser_session = true;
        self
    }

    pub fn with_credential(mut self, env_var: impl Into<String>) -> Self {
        self.api_credential = Some(env_var.into());
        self
    }

    pub fn with_process(mut self, program: impl Into<String>) -> Self {
        self.external_process = Some(program.into());
        self
    }
}

/// Everything an adapter gets for one invocation.
pub struct UnitContext {
    pub unit: ExecutionUnit,
    /// Validated target URL.
    pub url: String,
    /// Session for the unit's group, present only for adapters that ask for one.
    pub session: Option<Arc<dyn BrowserSession>>,
    /// Hard deadline for the unit, shared by all attempts.
    pub deadline: Instant,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl UnitContext {
    pub fn browser(&self) -> &str {
        &self.unit.browser
    }

    pub fn viewport(&self) -> &ViewportProfile {
        &self.unit.viewport
    }

    /// Time left before the unit's deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// The session, or `Unsupported` when the adapter was scheduled without one.
    pub fn require_session(&self) -> AdapterResult<&Arc<dyn BrowserSession>> {
        self.session.as_ref().ok_or_else(|| {
            AdapterError::Unsupported(format!(
                "adapter `{}` needs a browser session",
                self.unit.adapter
            ))
        })
    }
}

/// One accessibility engine.
///
/// Implementations hold configuration only. They keep no state between
/// invocations and may be invoked concurrently for different units.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Registry name, e.g. `axe` or `wcag22-rules`.
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    async fn invoke(&self, ctx: &UnitContext) -> AdapterResult<RawPayload>;
}

/// Adapters available to one run, keyed by name.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one with the same name.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> &mut Self {
        self.adapters.insert(adapter.name().to_string(), adapter);
        self
    }

    pub fn with(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.adapters.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Adapter>)> {
        self.adapters.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Check that `url` is an absolute http(s) or file URL.
pub fn resolve_url(url: &str) -> AdapterResult<String> {
    let trimmed = url.trim();
    let malformed = || AdapterError::MalformedUrl(url.to_string());
    let (scheme, rest) = trimmed.split_once("://").ok_or_else(malformed)?;
    let scheme = scheme.to_ascii_lowercase();
    let scheme_ok = matches!(scheme.as_str(), "http" | "https" | "file");
    if !scheme_ok || rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err(malformed());
    }
    if scheme != "file" && rest.starts_with('/') {
        return Err(malformed());
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Adapter for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::none().with_process("true")
        }

        async fn invoke(&self, _ctx: &UnitContext) -> AdapterResult<RawPayload> {
            Ok(RawPayload::Pa11y(serde_json::json!([])))
        }
    }

    #[test]
    fn registry_names_sorted() {
        let registry = AdapterRegistry::new()
            .with(Arc::new(Named("wave")))
            .with(Arc::new(Named("axe")));
        assert_eq!(
            registry.names().into_iter().collect::<Vec<_>>(),
            vec!["axe".to_string(), "wave".to_string()]
        );
        assert!(registry.contains("axe"));
        assert!(registry.get("pa11y").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn capability_builder() {
        let caps = Capabilities::none()
            .with_browser_session()
            .with_credential("WAVE_API_KEY");
        assert!(caps.browser_session);
        assert_eq!(caps.api_credential.as_deref(), Some("WAVE_API_KEY"));
        assert!(caps.external_process.is_none());
    }

    #[test]
    fn url_resolution() {
        assert_eq!(resolve_url(" https://a.test/x ").unwrap(), "https://a.test/x");
        assert!(resolve_url("file:///tmp/page.html").is_ok());
        assert!(matches!(
            resolve_url("a.test"),
            Err(AdapterError::MalformedUrl(_))
        ));
        assert!(resolve_url("ftp://a.test").is_err());
        assert!(resolve_url("https://").is_err());
        assert!(resolve_url("https://a test").is_err());
        assert!(resolve_url("https:///path").is_err());
    }
}
