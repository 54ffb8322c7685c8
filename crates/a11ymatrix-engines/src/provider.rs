//! Static page provider.
//!
//! Sessions fetch the served HTML over HTTP, or read it from disk for
//! `file://` URLs. Nothing is rendered, so snapshots carry no layout and
//! geometry-based criteria fall back to manual checks.

use std::sync::Arc;
use std::time::Duration;

use a11ymatrix_core::{
    AdapterError, AdapterResult, BrowserProvider, BrowserSession, PageSnapshot, ViewportProfile,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::http::{check_status, classify, default_client};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpPageProvider {
    client: Client,
    fetch_timeout: Duration,
}

impl HttpPageProvider {
    pub fn new() -> AdapterResult<Self> {
        Ok(Self::with_client(default_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

#[async_trait]
impl BrowserProvider for HttpPageProvider {
    async fn launch(
        &self,
        browser: &str,
        viewport: &ViewportProfile,
    ) -> AdapterResult<Arc<dyn BrowserSession>> {
        debug!(browser, viewport = %viewport.name, "opening static page session");
        Ok(Arc::new(HttpPageSession {
            client: self.client.clone(),
            browser: browser.to_string(),
            viewport: viewport.clone(),
            fetch_timeout: self.fetch_timeout,
        }))
    }
}

pub struct HttpPageSession {
    client: Client,
    browser: String,
    viewport: ViewportProfile,
    fetch_timeout: Duration,
}

impl HttpPageSession {
    async fn fetch(&self, url: &str) -> AdapterResult<(String, Option<String>)> {
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| classify(e, self.fetch_timeout))?;
        let response = check_status(response)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let html = response
            .text()
            .await
            .map_err(|e| classify(e, self.fetch_timeout))?;
        Ok((html, content_type))
    }

    async fn read_file(&self, url: &str) -> AdapterResult<(String, Option<String>)> {
        let path = file_path(url)?;
        let html = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AdapterError::HttpStatus { status: 404 },
                std::io::ErrorKind::PermissionDenied => AdapterError::HttpStatus { status: 403 },
                _ => AdapterError::Network(format!("read {path}: {e}")),
            })?;
        let content_type = if path.ends_with(".html") || path.ends_with(".htm") {
            Some("text/html".to_string())
        } else {
            None
        };
        Ok((html, content_type))
    }
}

/// Local path of a `file://` URL.
fn file_path(url: &str) -> AdapterResult<&str> {
    let rest = url
        .strip_prefix("file://")
        .ok_or_else(|| AdapterError::MalformedUrl(url.to_string()))?;
    // file://localhost/path
    let path = rest.strip_prefix("localhost").unwrap_or(rest);
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(AdapterError::MalformedUrl(url.to_string()))
    }
}

#[async_trait]
impl BrowserSession for HttpPageSession {
    fn browser(&self) -> &str {
        &self.browser
    }

    fn viewport(&self) -> &ViewportProfile {
        &self.viewport
    }

    async fn snapshot(&self, url: &str) -> AdapterResult<PageSnapshot> {
        let (html, content_type) = if url.starts_with("file://") {
            self.read_file(url).await?
        } else {
            self.fetch(url).await?
        };
        Ok(PageSnapshot {
            url: url.to_string(),
            html,
            viewport: self.viewport.clone(),
            content_type,
            layout: None,
        })
    }

    async fn close(&self) {}
}
