//! Group worker: runs the units of one `(url, browser, viewport)` group in
//! order, sharing one session lease across the adapters that need it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::warn;

use super::lifecycle::{UnitLifecycle, UnitState};
use super::retry::{RetryDecision, RetryPolicy};
use super::store::ResultStore;
use crate::adapter::{
    resolve_url, Adapter, AdapterRegistry, SessionLease, SessionPool, UnitContext,
};
use crate::domain::error::{AdapterError, AdapterResult, FailureClass};
use crate::domain::model::{ExecutionUnit, RawPayload, RawResult, ResultStatus, UnitError};
use crate::matrix::UnitGroup;
use crate::metrics::SchedulerMetrics;
use crate::obs;

/// Everything a group worker shares with its siblings.
pub(crate) struct WorkerContext {
    pub registry: AdapterRegistry,
    pub pool: Option<Arc<SessionPool>>,
    pub metrics: Arc<SchedulerMetrics>,
    pub retry: RetryPolicy,
    pub unit_timeout: Duration,
    pub store: Arc<Mutex<ResultStore>>,
}

/// Resolves once the run is cancelled. Never resolves if the sender is gone.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run every unit of `group`. Returns the units left undispatched because
/// the run was cancelled.
pub(crate) async fn run_group(
    ctx: Arc<WorkerContext>,
    group: UnitGroup,
    mut cancel: watch::Receiver<bool>,
) -> Vec<ExecutionUnit> {
    let mut lease: Option<SessionLease> = None;
    let mut undispatched = Vec::new();
    let mut units = group.units.into_iter();

    while let Some(unit) = units.next() {
        if *cancel.borrow() {
            undispatched.push(unit);
            undispatched.extend(units.by_ref());
            break;
        }

        let adapter = ctx.registry.get(&unit.adapter);
        let needs_session = adapter
            .as_ref()
            .is_some_and(|a| a.capabilities().browser_session);

        let mut setup_error = None;
        if needs_session && lease.is_none() {
            match &ctx.pool {
                Some(pool) => {
                    let reserved = tokio::select! {
                        biased;
                        _ = cancelled(&mut cancel) => None,
                        reserved = pool.reserve(&group.key) => Some(reserved),
                    };
                    match reserved {
                        None => {
                            undispatched.push(unit);
                            undispatched.extend(units.by_ref());
                            break;
                        }
                        Some(Ok(reserved)) => lease = Some(reserved),
                        Some(Err(e)) => setup_error = Some(e),
                    }
                }
                None => {
                    setup_error = Some(AdapterError::Unsupported(format!(
                        "adapter `{}` needs a browser session but no provider is configured",
                        unit.adapter
                    )))
                }
            }
        }

        let session = if needs_session { lease.as_mut() } else { None };
        let result = execute(&ctx, unit, adapter, session, setup_error).await;
        ctx.store.lock().await.record(result);
    }

    if let Some(lease) = lease {
        lease.release().await;
    }
    undispatched
}

struct Attempted {
    state: UnitState,
    payload: Option<RawPayload>,
    attempts: u32,
    error: Option<UnitError>,
}

impl Attempted {
    fn failed(attempts: u32, error: &AdapterError) -> Self {
        Self {
            state: UnitState::Failed,
            payload: None,
            attempts,
            error: Some(UnitError::from(error)),
        }
    }

    fn timed_out(attempts: u32, budget: Duration) -> Self {
        Self {
            state: UnitState::TimedOut,
            payload: None,
            attempts,
            error: Some(UnitError {
                kind: "timeout".to_string(),
                class: FailureClass::Transient,
                message: format!("unit exceeded its {}ms budget", budget.as_millis()),
            }),
        }
    }
}

async fn execute(
    ctx: &WorkerContext,
    unit: ExecutionUnit,
    adapter: Option<Arc<dyn Adapter>>,
    lease: Option<&mut SessionLease>,
    setup_error: Option<AdapterError>,
) -> RawResult {
    let mut lifecycle = UnitLifecycle::new(unit.clone());
    if let Err(e) = lifecycle.start() {
        warn!(error = %e, "unit lifecycle");
    }
    ctx.metrics.inc_dispatched();
    obs::emit_unit_dispatched(&unit);

    let started = Instant::now();
    let deadline = started + ctx.unit_timeout;
    let attempted = match (adapter, setup_error) {
        (_, Some(e)) => Attempted::failed(0, &e),
        (None, None) => Attempted::failed(
            0,
            &AdapterError::Unsupported(format!("adapter `{}` is not registered", unit.adapter)),
        ),
        (Some(adapter), None) => {
            attempt_until_done(ctx, &unit, adapter.as_ref(), lease, deadline).await
        }
    };

    if let Err(e) = lifecycle.finish(attempted.state) {
        warn!(error = %e, "unit lifecycle");
    }
    match attempted.state {
        UnitState::Completed => ctx.metrics.inc_completed(),
        UnitState::TimedOut => ctx.metrics.inc_timed_out(),
        _ => ctx.metrics.inc_failed(),
    }

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    obs::emit_unit_finished(&unit, attempted.state.as_str(), attempted.attempts, duration_ms);

    RawResult {
        unit,
        status: attempted.state.result_status().unwrap_or(ResultStatus::Error),
        payload: attempted.payload,
        duration_ms,
        attempts: attempted.attempts,
        error: attempted.error,
    }
}

/// Attempt loop. The unit's deadline bounds every attempt and every backoff.
async fn attempt_until_done(
    ctx: &WorkerContext,
    unit: &ExecutionUnit,
    adapter: &dyn Adapter,
    mut lease: Option<&mut SessionLease>,
    deadline: Instant,
) -> Attempted {
    let url = match resolve_url(&unit.url) {
        Ok(url) => url,
        Err(e) => return Attempted::failed(1, &e),
    };

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let outcome = tokio::time::timeout(
            remaining,
            invoke_once(adapter, unit, &url, deadline, attempt, lease.as_deref_mut()),
        )
        .await;

        let err = match outcome {
            Ok(Ok(payload)) => {
                return Attempted {
                    state: UnitState::Completed,
                    payload: Some(payload),
                    attempts: attempt,
                    error: None,
                }
            }
            Ok(Err(err)) => err,
            Err(_elapsed) => {
                if let Some(lease) = lease.as_deref_mut() {
                    lease.discard("timeout").await;
                }
                return Attempted::timed_out(attempt, ctx.unit_timeout);
            }
        };

        if matches!(
            err,
            AdapterError::BrowserCrashed(_) | AdapterError::Timeout { .. }
        ) {
            if let Some(lease) = lease.as_deref_mut() {
                lease.discard(err.kind()).await;
            }
        }

        match ctx.retry.decide(attempt, &err) {
            RetryDecision::Retry { delay } => {
                if Instant::now() + delay >= deadline {
                    tokio::time::sleep_until(deadline).await;
                    return Attempted::timed_out(attempt, ctx.unit_timeout);
                }
                ctx.metrics.inc_retries();
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                obs::emit_unit_retry(unit, attempt, delay_ms, &err);
                tokio::time::sleep(delay).await;
            }
            RetryDecision::GiveUp => {
                let mut attempted = Attempted::failed(attempt, &err);
                if matches!(err, AdapterError::Timeout { .. }) {
                    attempted.state = UnitState::TimedOut;
                }
                return attempted;
            }
        }
    }
}

async fn invoke_once(
    adapter: &dyn Adapter,
    unit: &ExecutionUnit,
    url: &str,
    deadline: Instant,
    attempt: u32,
    lease: Option<&mut SessionLease>,
) -> AdapterResult<RawPayload> {
    let session = match lease {
        Some(lease) => Some(lease.session().await?),
        None => None,
    };
    let ctx = UnitContext {
        unit: unit.clone(),
        url: url.to_string(),
        session,
        deadline,
        attempt,
    };
    adapter.invoke(&ctx).await
}
