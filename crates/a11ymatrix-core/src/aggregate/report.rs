//! Report structures handed to the reporting layer.
//!
//! Reports are built once per run and read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::links::CrossToolLink;
use super::pivot::{pivot, pivot_where, Dimension};
use crate::domain::model::{
    NormalizedIssue, Outcome, ResultStatus, Severity, UnitError, ViewportProfile,
};

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Issue counts by outcome and severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTotals {
    pub issues: usize,
    pub by_outcome: BTreeMap<Outcome, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl IssueTotals {
    pub fn add(&mut self, issue: &NormalizedIssue, count: usize) {
        self.issues += count;
        *self.by_outcome.entry(issue.outcome).or_default() += count;
        *self.by_severity.entry(issue.severity).or_default() += count;
    }

    pub fn merge(&mut self, other: &IssueTotals) {
        self.issues += other.issues;
        for (outcome, n) in &other.by_outcome {
            *self.by_outcome.entry(*outcome).or_default() += n;
        }
        for (severity, n) in &other.by_severity {
            *self.by_severity.entry(*severity).or_default() += n;
        }
    }

    pub fn outcome(&self, outcome: Outcome) -> usize {
        self.by_outcome.get(&outcome).copied().unwrap_or(0)
    }

    pub fn severity(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Units that ended without usable issues, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounts {
    /// Adapter failures (including permanent ones and exhausted retries).
    pub failed: usize,
    pub timed_out: usize,
    /// Payloads that did not match their adapter's shape.
    pub normalization: usize,
}

impl ErrorCounts {
    pub fn total(&self) -> usize {
        self.failed + self.timed_out + self.normalization
    }

    pub fn merge(&mut self, other: &ErrorCounts) {
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        self.normalization += other.normalization;
    }
}

// ---------------------------------------------------------------------------
// Per-scope and per-URL reports
// ---------------------------------------------------------------------------

/// Issues sharing one fingerprint within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedIssueGroup {
    pub fingerprint: String,
    /// First issue seen with this fingerprint.
    pub representative: NormalizedIssue,
    /// Adapters whose findings are linked to this group, including its own.
    pub contributing_adapters: BTreeSet<String>,
    pub occurrence_count: usize,
}

/// One `(browser, viewport, adapter)` result for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeReport {
    pub browser: String,
    pub viewport: ViewportProfile,
    pub adapter: String,
    pub status: ResultStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<UnitError>,
    pub normalization_error: Option<String>,
    pub groups: Vec<AggregatedIssueGroup>,
    pub totals: IssueTotals,
}

impl ScopeReport {
    /// Errored or timed-out scopes report zero issues for a different reason
    /// than clean ones.
    pub fn is_error(&self) -> bool {
        self.status != ResultStatus::Ok
    }

    pub fn errors(&self) -> ErrorCounts {
        let mut counts = ErrorCounts::default();
        match self.status {
            ResultStatus::Ok => {}
            ResultStatus::Timeout => counts.timed_out = 1,
            ResultStatus::Error if self.normalization_error.is_some() => counts.normalization = 1,
            ResultStatus::Error => counts.failed = 1,
        }
        counts
    }

    /// Each stored issue with its occurrence weight.
    pub fn weighted_issues(&self) -> impl Iterator<Item = (&NormalizedIssue, usize)> {
        self.groups
            .iter()
            .map(|g| (&g.representative, g.occurrence_count))
    }
}

/// Everything found for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlReport {
    pub url: String,
    pub scopes: Vec<ScopeReport>,
    pub totals: IssueTotals,
    pub errors: ErrorCounts,
    pub links: Vec<CrossToolLink>,
}

impl UrlReport {
    pub fn scope(&self, browser: &str, viewport: &str, adapter: &str) -> Option<&ScopeReport> {
        self.scopes.iter().find(|s| {
            s.browser == browser && s.viewport.name == viewport && s.adapter == adapter
        })
    }

    /// Cross-tool links touching WCAG criterion `criterion`.
    pub fn links_for_criterion(&self, criterion: &str) -> Vec<&CrossToolLink> {
        self.links
            .iter()
            .filter(|l| l.criteria.contains(criterion))
            .collect()
    }

    /// Cross-tool links for one normalized element selector.
    pub fn links_for_element(&self, selector: &str) -> Vec<&CrossToolLink> {
        self.links
            .iter()
            .filter(|l| l.element_selector == selector)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Run-wide totals and pivots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub urls: usize,
    pub units: usize,
    pub totals: IssueTotals,
    pub by_adapter: BTreeMap<String, usize>,
    pub by_criterion: BTreeMap<String, usize>,
    pub by_viewport: BTreeMap<String, usize>,
    pub by_browser: BTreeMap<String, usize>,
    pub failed_by_severity: BTreeMap<String, usize>,
    pub failed_by_criterion: BTreeMap<String, usize>,
    pub errors: ErrorCounts,
    pub errors_by_adapter: BTreeMap<String, ErrorCounts>,
    pub cross_tool_links: usize,
}

impl SummaryReport {
    /// Summarize `reports`. Totals are the sums of the URL reports' totals.
    pub fn from_url_reports(reports: &[UrlReport]) -> Self {
        let mut summary = SummaryReport {
            urls: reports.len(),
            ..Self::default()
        };
        for report in reports {
            summary.units += report.scopes.len();
            summary.totals.merge(&report.totals);
            summary.errors.merge(&report.errors);
            summary.cross_tool_links += report.links.len();
            for scope in &report.scopes {
                summary
                    .errors_by_adapter
                    .entry(scope.adapter.clone())
                    .or_default()
                    .merge(&scope.errors());
            }
        }
        summary.by_adapter = pivot(reports, Dimension::Adapter);
        summary.by_criterion = pivot(reports, Dimension::Criterion);
        summary.by_viewport = pivot(reports, Dimension::Viewport);
        summary.by_browser = pivot(reports, Dimension::Browser);
        let failed = |i: &NormalizedIssue| i.outcome == Outcome::Failed;
        summary.failed_by_severity = pivot_where(reports, Dimension::Severity, failed);
        summary.failed_by_criterion = pivot_where(reports, Dimension::Criterion, failed);
        summary
    }

    pub fn total_errors(&self) -> usize {
        self.errors.total()
    }

    pub fn failed(&self) -> usize {
        self.totals.outcome(Outcome::Failed)
    }
}

/// The complete result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub url_reports: Vec<UrlReport>,
    pub summary: SummaryReport,
}

impl RunReport {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        url_reports: Vec<UrlReport>,
    ) -> Self {
        let duration_ms = u64::try_from((finished_at - started_at).num_milliseconds()).unwrap_or(0);
        let summary = SummaryReport::from_url_reports(&url_reports);
        Self {
            run_id,
            started_at,
            finished_at,
            duration_ms,
            url_reports,
            summary,
        }
    }

    pub fn url_report(&self, url: &str) -> Option<&UrlReport> {
        self.url_reports.iter().find(|r| r.url == url)
    }
}
