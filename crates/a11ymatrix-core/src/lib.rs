//! a11ymatrix core library
//!
//! Expands accessibility test matrices, schedules engine adapters over them,
//! normalizes engine output into one issue model and aggregates it into
//! per-URL and run-wide reports.

pub mod adapter;
pub mod aggregate;
pub mod config;
pub mod domain;
pub mod gate;
pub mod matrix;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod reporting;
pub mod scheduler;
pub mod telemetry;

pub use adapter::{
    resolve_url, Adapter, AdapterRegistry, BrowserProvider, BrowserSession, Capabilities,
    ElementBox, PageSnapshot, SessionLease, SessionPool, UnitContext,
};
pub use aggregate::{
    build_url_reports, pivot, pivot_where, AggregatedIssueGroup, CrossToolLink, Dimension,
    ErrorCounts, IssueTotals, RunReport, ScopeReport, SummaryReport, UrlReport,
};
pub use config::{AdapterSettings, ConfigOverrides, RunConfig};
pub use domain::{
    AdapterError, AdapterResult, ConfigError, ConfigResult, CriteriaReport, CriterionEvaluation,
    CriterionIssue, CriterionOutcome, Evidence, ExecutionUnit, FailureClass, GroupKey,
    NormalizationError, NormalizedIssue, Outcome, RawPayload, RawResult, ResultStatus, RunError,
    RunResult, Severity, UnitError, ViewportProfile, WcagLevel,
};
pub use gate::{evaluate_gate, GateRule, GateRuleSet, GateVerdict, Violation};
pub use matrix::{expand, group_units, UnitGroup};
pub use metrics::SchedulerMetrics;
pub use normalize::{normalize_all, normalize_payload, normalize_result, NormalizedUnit};
pub use reporting::{render_summary_md, write_run_report_json, write_summary_md};
pub use scheduler::{
    RetryPolicy, RunCanceller, RunHandle, RunOutcome, Scheduler, SchedulerSettings, UnitState,
};
