//! Scheduler: drives every execution unit of a run to a terminal state.
//!
//! - Units are grouped by `(url, browser, viewport)`; a group holds one
//!   execution slot and runs its adapters in expansion order, sharing one
//!   session lease
//! - Slots are bounded by `concurrency`, sessions by `max_sessions`
//! - Each unit has its own deadline covering all attempts and backoff
//! - Cancellation stops dispatch; running units finish or time out on their own
//!
//! Results are normalized and aggregated once every dispatched unit is
//! terminal.

pub mod lifecycle;
pub mod retry;
pub mod store;
mod worker;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{warn, Instrument};
use uuid::Uuid;

pub use lifecycle::{TransitionError, UnitLifecycle, UnitState};
pub use retry::{RetryDecision, RetryPolicy};
pub use store::ResultStore;

use crate::adapter::{AdapterRegistry, BrowserProvider, SessionPool};
use crate::aggregate::{build_url_reports, RunReport};
use crate::config::RunConfig;
use crate::domain::error::{FailureClass, RunError, RunResult};
use crate::domain::model::{ExecutionUnit, RawResult, ResultStatus, UnitError};
use crate::matrix;
use crate::metrics::SchedulerMetrics;
use crate::normalize::normalize_all;
use crate::obs;
use worker::{cancelled, run_group, WorkerContext};

/// Resource limits and timing for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub concurrency: usize,
    pub max_sessions: usize,
    pub unit_timeout: Duration,
    pub retry: RetryPolicy,
}

impl From<&RunConfig> for SchedulerSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_sessions: config.effective_max_sessions().max(1),
            unit_timeout: Duration::from_millis(config.timeout_ms),
            retry: RetryPolicy::new(config.max_retries, config.backoff_base_ms),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every unit reached a terminal state.
    Completed(RunReport),
    /// The caller cancelled. The report covers dispatched units only.
    Aborted {
        report: RunReport,
        undispatched: Vec<ExecutionUnit>,
    },
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Aborted { report, .. } => report,
        }
    }

    pub fn into_report(self) -> RunReport {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Aborted { report, .. } => report,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted { .. })
    }
}

/// Cancels a run from outside the task awaiting it.
#[derive(Clone)]
pub struct RunCanceller {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl RunCanceller {
    /// Stop dispatching new units. Idempotent.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

/// Handle to a started run.
pub struct RunHandle {
    run_id: Uuid,
    units: Vec<ExecutionUnit>,
    cancel_tx: Arc<watch::Sender<bool>>,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Every unit of the run, in expansion order.
    pub fn units(&self) -> &[ExecutionUnit] {
        &self.units
    }

    /// Stop dispatching new units. Idempotent.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn canceller(&self) -> RunCanceller {
        RunCanceller {
            cancel_tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Wait until every dispatched unit is terminal and the report is built.
    pub async fn await_completion(self) -> RunResult<RunOutcome> {
        self.task.await.map_err(|e| RunError::Join(e.to_string()))
    }
}

/// Runs test matrices against a fixed set of adapters.
pub struct Scheduler {
    registry: AdapterRegistry,
    provider: Option<Arc<dyn BrowserProvider>>,
    metrics: Arc<SchedulerMetrics>,
}

impl Scheduler {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            provider: None,
            metrics: Arc::new(SchedulerMetrics::new()),
        }
    }

    /// Provider for adapters that need a browser session.
    pub fn with_browser_provider(mut self, provider: Arc<dyn BrowserProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<SchedulerMetrics> {
        &self.metrics
    }

    /// Validate and expand `config`, then start the run on the current Tokio
    /// runtime. Configuration errors are returned before anything runs.
    pub fn start_run(&self, config: &RunConfig) -> RunResult<RunHandle> {
        let units = matrix::expand(config, &self.registry.names())?;
        let settings = SchedulerSettings::from(config);
        let run_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let pool = self.provider.as_ref().map(|provider| {
            Arc::new(SessionPool::new(
                Arc::clone(provider),
                settings.max_sessions,
                Arc::clone(&self.metrics),
            ))
        });
        let ctx = Arc::new(WorkerContext {
            registry: self.registry.clone(),
            pool,
            metrics: Arc::clone(&self.metrics),
            retry: settings.retry,
            unit_timeout: settings.unit_timeout,
            store: Arc::new(Mutex::new(ResultStore::new())),
        });

        let span = obs::run_span(&run_id.to_string());
        let task = tokio::spawn(
            drive(run_id, units.clone(), ctx, settings.concurrency, cancel_rx).instrument(span),
        );
        Ok(RunHandle {
            run_id,
            units,
            cancel_tx: Arc::new(cancel_tx),
            task,
        })
    }

    /// Start a run and wait for it.
    pub async fn run(&self, config: &RunConfig) -> RunResult<RunOutcome> {
        self.start_run(config)?.await_completion().await
    }
}

async fn drive(
    run_id: Uuid,
    units: Vec<ExecutionUnit>,
    ctx: Arc<WorkerContext>,
    concurrency: usize,
    mut cancel_rx: watch::Receiver<bool>,
) -> RunOutcome {
    let run_label = run_id.to_string();
    let started_at = Utc::now();
    let clock = Instant::now();
    let groups = matrix::group_units(&units);
    obs::emit_run_started(&run_label, units.len(), groups.len(), concurrency);

    let slots = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();
    let mut undispatched: Vec<ExecutionUnit> = Vec::new();
    let mut remaining = groups.into_iter();

    while let Some(group) = remaining.next() {
        let permit = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => None,
            permit = Arc::clone(&slots).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            undispatched.extend(group.units);
            undispatched.extend(remaining.by_ref().flat_map(|g| g.units));
            break;
        };

        let ctx = Arc::clone(&ctx);
        let rx = cancel_rx.clone();
        workers.spawn(
            async move {
                let left = run_group(ctx, group, rx).await;
                drop(permit);
                left
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(left) => undispatched.extend(left),
            Err(e) => warn!(event = "worker.failed", error = %e, "group worker ended abnormally"),
        }
    }
    undispatched.sort();

    let mut store = std::mem::take(&mut *ctx.store.lock().await);
    let skipped: BTreeSet<&ExecutionUnit> = undispatched.iter().collect();
    for unit in &units {
        if !store.contains(unit) && !skipped.contains(unit) {
            store.record(worker_failed(unit.clone()));
        }
    }

    let aborted = *cancel_rx.borrow();
    ctx.metrics.flush();

    let normalized = normalize_all(store.into_results());
    let report = RunReport::new(run_id, started_at, Utc::now(), build_url_reports(&normalized));
    let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

    if aborted {
        obs::emit_run_cancelled(&run_label, undispatched.len());
        obs::emit_run_finished(&run_label, duration_ms, normalized.len(), true);
        RunOutcome::Aborted {
            report,
            undispatched,
        }
    } else {
        obs::emit_run_finished(&run_label, duration_ms, normalized.len(), false);
        RunOutcome::Completed(report)
    }
}

/// Result for a unit whose worker task died before recording one.
fn worker_failed(unit: ExecutionUnit) -> RawResult {
    RawResult {
        unit,
        status: ResultStatus::Error,
        payload: None,
        duration_ms: 0,
        attempts: 0,
        error: Some(UnitError {
            kind: "worker_failed".to_string(),
            class: FailureClass::Permanent,
            message: "group worker ended before recording a result".to_string(),
        }),
    }
}
