//! Structured observability hooks for the run lifecycle.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard and [`run_span`]
//! - Emission functions for key lifecycle events: run start and finish,
//!   unit dispatch, retry and completion, session acquire and release,
//!   cancellation, and normalization errors
//!
//! Events are emitted at `info!` level except failures, which use `warn!`.
//! Filtering follows `RUST_LOG` through [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

use crate::domain::model::{ExecutionUnit, GroupKey};

/// RAII guard that enters a run-scoped tracing span.
///
/// ```ignore
/// let _span = RunSpan::enter("0b9d...");
/// // every event below carries run_id
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// The run span itself, for instrumenting spawned futures where an entered
/// guard cannot be held across `.await`.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("a11ymatrix.run", run_id = %run_id)
}

/// Emit event: run started with its matrix size.
pub fn emit_run_started(run_id: &str, units: usize, groups: usize, concurrency: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        units = units,
        groups = groups,
        concurrency = concurrency,
    );
}

/// Emit event: unit handed to its adapter for the first time.
pub fn emit_unit_dispatched(unit: &ExecutionUnit) {
    info!(
        event = "unit.dispatched",
        url = %unit.url,
        browser = %unit.browser,
        viewport = %unit.viewport.name,
        adapter = %unit.adapter,
    );
}

/// Emit event: a transient failure will be retried after `delay_ms`.
pub fn emit_unit_retry(
    unit: &ExecutionUnit,
    attempt: u32,
    delay_ms: u64,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "unit.retry",
        url = %unit.url,
        adapter = %unit.adapter,
        attempt = attempt,
        delay_ms = delay_ms,
        error = %error,
    );
}

/// Emit event: unit reached a terminal state.
pub fn emit_unit_finished(unit: &ExecutionUnit, state: &str, attempts: u32, duration_ms: u64) {
    info!(
        event = "unit.finished",
        url = %unit.url,
        browser = %unit.browser,
        viewport = %unit.viewport.name,
        adapter = %unit.adapter,
        state = %state,
        attempts = attempts,
        duration_ms = duration_ms,
    );
}

/// Emit event: a session was launched for a group.
pub fn emit_session_acquired(key: &GroupKey) {
    info!(event = "session.acquired", group = %key);
}

/// Emit event: a session was closed.
pub fn emit_session_released(key: &GroupKey, reason: &str) {
    info!(event = "session.released", group = %key, reason = %reason);
}

/// Emit event: the caller cancelled the run.
pub fn emit_run_cancelled(run_id: &str, undispatched: usize) {
    warn!(event = "run.cancelled", run_id = %run_id, undispatched = undispatched);
}

/// Emit event: run finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, units: usize, aborted: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        units = units,
        aborted = aborted,
    );
}

/// Emit event: a payload could not be normalized (warning level).
pub fn emit_normalize_error(unit: &ExecutionUnit, error: &dyn std::fmt::Display) {
    warn!(
        event = "normalize.error",
        url = %unit.url,
        adapter = %unit.adapter,
        error = %error,
    );
}
