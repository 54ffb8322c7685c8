//! Browser sessions and the session pool.
//!
//! The scheduler is the only owner of session allocation. A group of units
//! reserves a [`SessionLease`] from the [`SessionPool`], launches the
//! session lazily through the [`BrowserProvider`], and hands it back with
//! [`SessionLease::release`] once the group is done.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::domain::error::{AdapterError, AdapterResult};
use crate::domain::model::{GroupKey, ViewportProfile};
use crate::metrics::SchedulerMetrics;
use crate::obs;

/// Rendered geometry for one element, as reported by a browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub selector: String,
    pub tag: String,
    pub width: f64,
    pub height: f64,
    /// Left edge in CSS px from the document origin, when measured.
    #[serde(default)]
    pub x: Option<f64>,
    /// Top edge in CSS px from the document origin, when measured.
    #[serde(default)]
    pub y: Option<f64>,
    /// Laid out inline within a sentence or block of text.
    #[serde(default)]
    pub inline: bool,
    #[serde(default)]
    pub focusable: bool,
    /// Entirely hidden by author content when focused.
    #[serde(default)]
    pub obscured_on_focus: bool,
    /// Thickness of the visible focus indicator, when measured.
    #[serde(default)]
    pub focus_indicator_px: Option<f64>,
}

impl ElementBox {
    /// Center of the box, when its position is known.
    pub fn center(&self) -> Option<(f64, f64)> {
        Some((self.x? + self.width / 2.0, self.y? + self.height / 2.0))
    }

    /// Distance from `(px, py)` to the nearest point of the box.
    pub fn distance_to(&self, px: f64, py: f64) -> Option<f64> {
        let (x, y) = (self.x?, self.y?);
        let dx = (x - px).max(px - (x + self.width)).max(0.0);
        let dy = (y - py).max(py - (y + self.height)).max(0.0);
        Some(dx.hypot(dy))
    }
}

/// A page as seen by a session at the unit's viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub viewport: ViewportProfile,
    /// `Content-Type` header value, when known.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Element geometry. `None` when the provider cannot render layout.
    #[serde(default)]
    pub layout: Option<Vec<ElementBox>>,
}

/// A live browser (or page provider) handle with its viewport applied.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn browser(&self) -> &str;

    fn viewport(&self) -> &ViewportProfile;

    /// Navigate to `url` and capture the page.
    async fn snapshot(&self, url: &str) -> AdapterResult<PageSnapshot>;

    async fn close(&self);
}

/// Launches sessions for the pool.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn launch(
        &self,
        browser: &str,
        viewport: &ViewportProfile,
    ) -> AdapterResult<Arc<dyn BrowserSession>>;
}

/// Bounded pool of concurrent sessions.
pub struct SessionPool {
    provider: Arc<dyn BrowserProvider>,
    permits: Arc<Semaphore>,
    capacity: usize,
    metrics: Arc<SchedulerMetrics>,
}

impl SessionPool {
    pub fn new(
        provider: Arc<dyn BrowserProvider>,
        capacity: usize,
        metrics: Arc<SchedulerMetrics>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            provider,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            metrics,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sessions that could be reserved right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a free session slot for `key`. The session itself is launched
    /// on first use.
    pub async fn reserve(&self, key: &GroupKey) -> AdapterResult<SessionLease> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AdapterError::Unsupported("session pool is closed".to_string()))?;
        Ok(SessionLease {
            provider: Arc::clone(&self.provider),
            key: key.clone(),
            session: None,
            metrics: Arc::clone(&self.metrics),
            _permit: permit,
        })
    }
}

/// A reserved session slot, optionally holding a launched session.
///
/// Call [`release`](Self::release) on every exit path. Dropping a lease with a
/// live session frees the slot but cannot close the session.
pub struct SessionLease {
    provider: Arc<dyn BrowserProvider>,
    key: GroupKey,
    session: Option<Arc<dyn BrowserSession>>,
    metrics: Arc<SchedulerMetrics>,
    _permit: OwnedSemaphorePermit,
}

impl SessionLease {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn is_launched(&self) -> bool {
        self.session.is_some()
    }

    /// The group's session, launching it if needed.
    pub async fn session(&mut self) -> AdapterResult<Arc<dyn BrowserSession>> {
        if let Some(session) = &self.session {
            return Ok(Arc::clone(session));
        }
        let session = self
            .provider
            .launch(&self.key.browser, &self.key.viewport)
            .await?;
        self.metrics.inc_sessions_launched();
        obs::emit_session_acquired(&self.key);
        self.session = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Close the current session so the next use relaunches it.
    pub async fn discard(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            session.close().await;
            obs::emit_session_released(&self.key, reason);
        }
    }

    /// Close the session and free the slot.
    pub async fn release(mut self) {
        self.discard("released").await;
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!(
                event = "session.leaked",
                group = %self.key,
                "session lease dropped without release"
            );
        }
    }
}
