//! Read-only pivots over stored issues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::report::UrlReport;
use crate::domain::model::NormalizedIssue;

/// Key used for criterion pivots when an issue maps to no WCAG criterion.
pub const UNMAPPED_CRITERION: &str = "unmapped";

/// What to count issues by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Outcome,
    Severity,
    Adapter,
    /// An issue tagged with several criteria counts once under each.
    Criterion,
    Viewport,
    Browser,
}

impl Dimension {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outcome" => Some(Self::Outcome),
            "severity" => Some(Self::Severity),
            "adapter" => Some(Self::Adapter),
            "criterion" | "wcag" => Some(Self::Criterion),
            "viewport" => Some(Self::Viewport),
            "browser" => Some(Self::Browser),
            _ => None,
        }
    }
}

/// Count every stored issue by `dimension`.
pub fn pivot(reports: &[UrlReport], dimension: Dimension) -> BTreeMap<String, usize> {
    pivot_where(reports, dimension, |_| true)
}

/// Count the issues matching `filter` by `dimension`.
pub fn pivot_where<F>(
    reports: &[UrlReport],
    dimension: Dimension,
    filter: F,
) -> BTreeMap<String, usize>
where
    F: Fn(&NormalizedIssue) -> bool,
{
    let mut counts = BTreeMap::new();
    for scope in reports.iter().flat_map(|r| &r.scopes) {
        for (issue, weight) in scope.weighted_issues().filter(|(i, _)| filter(*i)) {
            let keys: Vec<String> = match dimension {
                Dimension::Outcome => vec![issue.outcome.to_string()],
                Dimension::Severity => vec![issue.severity.to_string()],
                Dimension::Adapter => vec![scope.adapter.clone()],
                Dimension::Viewport => vec![scope.viewport.name.clone()],
                Dimension::Browser => vec![scope.browser.clone()],
                Dimension::Criterion if issue.wcag_criteria.is_empty() => {
                    vec![UNMAPPED_CRITERION.to_string()]
                }
                Dimension::Criterion => issue.wcag_criteria.iter().cloned().collect(),
            };
            for key in keys {
                *counts.entry(key).or_default() += weight;
            }
        }
    }
    counts
}
