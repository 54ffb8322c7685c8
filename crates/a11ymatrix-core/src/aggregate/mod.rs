//! Aggregator: normalized units to URL and run reports.
//!
//! - [`build_url_reports`] groups units per URL into [`ScopeReport`]s keyed by
//!   browser, viewport and adapter, folding repeated fingerprints within a
//!   scope into one [`AggregatedIssueGroup`]
//! - cross-tool [`CrossToolLink`]s are computed per URL
//! - [`SummaryReport::from_url_reports`] adds URL totals up and exposes the
//!   [`pivot`] projections
//!
//! Arrival order of units does not matter: scopes are sorted before linking.

mod links;
mod pivot;
mod report;

use std::collections::{BTreeMap, BTreeSet};

pub use links::CrossToolLink;
pub use pivot::{pivot, pivot_where, Dimension, UNMAPPED_CRITERION};
pub use report::{
    AggregatedIssueGroup, ErrorCounts, IssueTotals, RunReport, ScopeReport, SummaryReport,
    UrlReport,
};

use crate::normalize::NormalizedUnit;

fn scope_report(unit: &NormalizedUnit) -> ScopeReport {
    let mut groups: Vec<AggregatedIssueGroup> = Vec::new();
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    let mut totals = IssueTotals::default();

    for issue in &unit.issues {
        totals.add(issue, 1);
        match index.get(issue.fingerprint.as_str()) {
            Some(&at) => groups[at].occurrence_count += 1,
            None => {
                index.insert(issue.fingerprint.as_str(), groups.len());
                groups.push(AggregatedIssueGroup {
                    fingerprint: issue.fingerprint.clone(),
                    representative: issue.clone(),
                    contributing_adapters: BTreeSet::from([issue.source_adapter.clone()]),
                    occurrence_count: 1,
                });
            }
        }
    }

    ScopeReport {
        browser: unit.unit.browser.clone(),
        viewport: unit.unit.viewport.clone(),
        adapter: unit.unit.adapter.clone(),
        status: unit.status,
        attempts: unit.attempts,
        duration_ms: unit.duration_ms,
        error: unit.error.clone(),
        normalization_error: unit.normalization_error.clone(),
        groups,
        totals,
    }
}

/// Build one report per URL, in URL order.
pub fn build_url_reports(units: &[NormalizedUnit]) -> Vec<UrlReport> {
    let mut by_url: BTreeMap<&str, Vec<ScopeReport>> = BTreeMap::new();
    for unit in units {
        by_url
            .entry(unit.unit.url.as_str())
            .or_default()
            .push(scope_report(unit));
    }

    by_url
        .into_iter()
        .map(|(url, mut scopes)| {
            scopes.sort_by(|a, b| {
                (&a.browser, &a.viewport, &a.adapter).cmp(&(&b.browser, &b.viewport, &b.adapter))
            });
            let links = links::link_scopes(&mut scopes);
            let mut totals = IssueTotals::default();
            let mut errors = ErrorCounts::default();
            for scope in &scopes {
                totals.merge(&scope.totals);
                errors.merge(&scope.errors());
            }
            UrlReport {
                url: url.to_string(),
                scopes,
                totals,
                errors,
                links,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FailureClass;
    use crate::domain::model::{
        ExecutionUnit, NormalizedIssue, Outcome, ResultStatus, Severity, UnitError,
        ViewportProfile,
    };
    use crate::domain::wcag::WcagLevel;

    fn issue(
        adapter: &str,
        rule: &str,
        selector: &str,
        criteria: &[&str],
        outcome: Outcome,
    ) -> NormalizedIssue {
        NormalizedIssue {
            fingerprint: crate::domain::fingerprint::fingerprint(
                adapter,
                rule,
                selector,
                Some(WcagLevel::A),
            ),
            source_adapter: adapter.to_string(),
            rule_id: rule.to_string(),
            severity: Severity::Serious,
            wcag_criteria: criteria.iter().map(|c| c.to_string()).collect(),
            wcag_level: Some(WcagLevel::A),
            outcome,
            description: String::new(),
            element_selector: selector.to_string(),
            evidence: Vec::new(),
        }
    }

    fn unit(url: &str, adapter: &str, issues: Vec<NormalizedIssue>) -> NormalizedUnit {
        NormalizedUnit {
            unit: ExecutionUnit::new(url, "chromium", ViewportProfile::desktop(), adapter),
            status: ResultStatus::Ok,
            attempts: 1,
            duration_ms: 10,
            error: None,
            normalization_error: None,
            issues,
        }
    }

    fn failed_unit(url: &str, adapter: &str, status: ResultStatus) -> NormalizedUnit {
        NormalizedUnit {
            status,
            error: Some(UnitError {
                kind: "timeout".into(),
                class: FailureClass::Transient,
                message: "budget".into(),
            }),
            ..unit(url, adapter, Vec::new())
        }
    }

    #[test]
    fn repeated_fingerprints_fold_into_one_group() {
        let dup = issue("axe", "image-alt", "img", &["1.1.1"], Outcome::Failed);
        let reports = build_url_reports(&[unit("https://a.test", "axe", vec![dup.clone(), dup])]);
        let scope = &reports[0].scopes[0];
        assert_eq!(scope.groups.len(), 1);
        assert_eq!(scope.groups[0].occurrence_count, 2);
        assert_eq!(scope.totals.issues, 2);
    }

    #[test]
    fn cross_tool_links_keep_per_adapter_counts() {
        let units = vec![
            unit(
                "https://a.test",
                "axe",
                vec![issue("axe", "image-alt", "img.hero", &["1.1.1"], Outcome::Failed)],
            ),
            unit(
                "https://a.test",
                "pa11y",
                vec![issue("pa11y", "H37", "img.hero", &["1.1.1"], Outcome::Failed)],
            ),
            unit(
                "https://a.test",
                "wave",
                vec![issue("wave", "contrast", "img.hero", &["1.4.3"], Outcome::Failed)],
            ),
        ];
        let reports = build_url_reports(&units);
        let report = &reports[0];
        assert_eq!(report.links.len(), 1);
        let link = &report.links[0];
        assert_eq!(link.guideline, "1.1");
        assert_eq!(link.adapters.len(), 2);
        assert_eq!(link.issues_by_adapter["axe"], 1);
        assert_eq!(report.totals.outcome(Outcome::Failed), 3);
        assert_eq!(report.links_for_criterion("1.1.1").len(), 1);
        assert_eq!(report.links_for_element("img.hero").len(), 1);

        let axe = report.scope("chromium", "desktop", "axe").unwrap();
        assert!(axe.groups[0].contributing_adapters.contains("pa11y"));
        let wave = report.scope("chromium", "desktop", "wave").unwrap();
        assert_eq!(wave.groups[0].contributing_adapters.len(), 1);
    }

    #[test]
    fn passed_issues_are_not_linked() {
        let passed = |adapter: &str| issue(adapter, "r", "html", &["3.1.1"], Outcome::Passed);
        let units = vec![
            unit("https://a.test", "axe", vec![passed("axe")]),
            unit("https://a.test", "pa11y", vec![passed("pa11y")]),
        ];
        assert!(build_url_reports(&units)[0].links.is_empty());
    }

    #[test]
    fn errors_counted_and_distinguishable_from_clean() {
        let units = vec![
            failed_unit("https://a.test", "axe", ResultStatus::Timeout),
            failed_unit("https://a.test", "wave", ResultStatus::Error),
            unit("https://a.test", "pa11y", Vec::new()),
        ];
        let reports = build_url_reports(&units);
        assert_eq!(reports[0].errors.timed_out, 1);
        assert_eq!(reports[0].errors.failed, 1);
        let clean = reports[0].scope("chromium", "desktop", "pa11y").unwrap();
        assert!(!clean.is_error());
        let summary = SummaryReport::from_url_reports(&reports);
        assert_eq!(summary.total_errors(), 2);
        assert_eq!(summary.errors_by_adapter["axe"].timed_out, 1);
        assert_eq!(summary.totals.issues, 0);
    }

    #[test]
    fn summary_is_additive_over_url_reports() {
        let units = vec![
            unit(
                "https://a.test",
                "axe",
                vec![
                    issue("axe", "image-alt", "img", &["1.1.1"], Outcome::Failed),
                    issue("axe", "html-has-lang", "html", &["3.1.1"], Outcome::Passed),
                ],
            ),
            unit(
                "https://b.test",
                "axe",
                vec![issue("axe", "label", "input", &["1.3.1", "4.1.2"], Outcome::Incomplete)],
            ),
        ];
        let reports = build_url_reports(&units);
        let summary = SummaryReport::from_url_reports(&reports);

        let mut expected = IssueTotals::default();
        for r in &reports {
            expected.merge(&r.totals);
        }
        assert_eq!(summary.totals, expected);
        assert_eq!(summary.urls, 2);
        assert_eq!(summary.by_adapter["axe"], 3);
        assert_eq!(summary.by_criterion["1.3.1"], 1);
        assert_eq!(summary.by_criterion["4.1.2"], 1);
        assert_eq!(summary.failed_by_criterion.len(), 1);
        assert_eq!(summary.failed_by_severity["serious"], 1);

        let by_outcome = pivot(&reports, Dimension::Outcome);
        let sum: usize = by_outcome.values().sum();
        assert_eq!(sum, summary.totals.issues);
    }
}
