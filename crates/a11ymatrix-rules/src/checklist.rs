//! Fixed-criterion evaluator.
//!
//! A [`Checklist`] is a closed, ordered set of [`Criterion`] implementations.
//! Each criterion is evaluated on its own:
//! - `Ok` results become `passed`, `failed` or `manual_check_required`
//! - `Err` results become `manual_check_required` carrying the reason
//!
//! Evaluation reads the page only, so evaluating the same page twice yields
//! the same report.

use std::collections::BTreeSet;

use a11ymatrix_core::{
    CriteriaReport, CriterionEvaluation, CriterionIssue, CriterionOutcome, Evidence,
    PageSnapshot, Severity, WcagLevel,
};
use tracing::{debug, warn};

use crate::error::RuleResult;
use crate::page::PageView;

/// Static description of one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriterionMeta {
    /// Checklist-specific id (`2.5.8`, `ja-lang`).
    pub id: &'static str,
    pub name: &'static str,
    /// WCAG success criteria this criterion maps to.
    pub wcag: &'static [&'static str],
    pub level: WcagLevel,
    /// Severity given to violations.
    pub severity: Severity,
    /// Other standards covering the same requirement (e.g. JIS X 8341-3 clauses).
    pub references: &'static [&'static str],
}

/// What a criterion decided about one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub outcome: CriterionOutcome,
    pub summary: String,
    pub evidence: Vec<Evidence>,
}

impl Finding {
    pub fn passed(summary: impl Into<String>) -> Self {
        Self {
            outcome: CriterionOutcome::Passed,
            summary: summary.into(),
            evidence: Vec::new(),
        }
    }

    pub fn failed(issues: Vec<CriterionIssue>, summary: impl Into<String>) -> Self {
        Self {
            outcome: CriterionOutcome::from_issues(issues),
            summary: summary.into(),
            evidence: Vec::new(),
        }
    }

    pub fn manual(instructions: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            outcome: CriterionOutcome::manual(instructions),
            summary: summary.into(),
            evidence: Vec::new(),
        }
    }

    /// Attach elements a reviewer should look at. Only meaningful on manual findings.
    pub fn with_candidates(mut self, more: Vec<CriterionIssue>) -> Self {
        if let CriterionOutcome::ManualCheckRequired { candidates, .. } = &mut self.outcome {
            candidates.extend(more);
        }
        self
    }

    pub fn with_evidence(mut self, label: impl Into<String>, detail: impl Into<String>) -> Self {
        self.evidence.push(Evidence::new(label, detail));
        self
    }
}

/// One independently evaluable rule.
pub trait Criterion: Send + Sync {
    fn meta(&self) -> &'static CriterionMeta;

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding>;
}

/// An ordered set of criteria evaluated together.
pub struct Checklist {
    name: &'static str,
    criteria: Vec<Box<dyn Criterion>>,
}

impl Checklist {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            criteria: Vec::new(),
        }
    }

    pub fn with(mut self, criterion: impl Criterion + 'static) -> Self {
        self.criteria.push(Box::new(criterion));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn metas(&self) -> impl Iterator<Item = &'static CriterionMeta> + '_ {
        self.criteria.iter().map(|c| c.meta())
    }

    /// Parse `snapshot` and evaluate every criterion against it.
    pub fn evaluate_snapshot(&self, snapshot: &PageSnapshot) -> CriteriaReport {
        self.evaluate(&PageView::from_snapshot(snapshot))
    }

    pub fn evaluate(&self, page: &PageView) -> CriteriaReport {
        let criteria = self
            .criteria
            .iter()
            .map(|criterion| self.evaluate_one(criterion.as_ref(), page))
            .collect();
        CriteriaReport {
            checklist: self.name.to_string(),
            criteria,
        }
    }

    fn evaluate_one(&self, criterion: &dyn Criterion, page: &PageView) -> CriterionEvaluation {
        let meta = criterion.meta();
        let finding = match criterion.evaluate(page) {
            Ok(finding) => finding,
            Err(err) => {
                warn!(
                    event = "criterion.undetermined",
                    checklist = self.name,
                    criterion = meta.id,
                    url = page.url(),
                    error = %err,
                    "criterion could not be evaluated automatically"
                );
                Finding::manual(
                    format!("Automatic evaluation failed ({err}); check {} manually.", meta.name),
                    "not evaluated",
                )
            }
        };
        debug!(
            checklist = self.name,
            criterion = meta.id,
            outcome = outcome_label(&finding.outcome),
            "criterion evaluated"
        );

        let mut evidence = finding.evidence;
        evidence.extend(meta.references.iter().map(|r| Evidence::new("reference", *r)));
        CriterionEvaluation {
            id: meta.id.to_string(),
            name: meta.name.to_string(),
            wcag: meta.wcag.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
            level: meta.level,
            severity: meta.severity,
            outcome: finding.outcome,
            summary: finding.summary,
            evidence,
        }
    }
}

impl std::fmt::Debug for Checklist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checklist")
            .field("name", &self.name)
            .field("criteria", &self.metas().map(|m| m.id).collect::<Vec<_>>())
            .finish()
    }
}

fn outcome_label(outcome: &CriterionOutcome) -> &'static str {
    match outcome {
        CriterionOutcome::Passed => "passed",
        CriterionOutcome::Failed { .. } => "failed",
        CriterionOutcome::ManualCheckRequired { .. } => "manual_check_required",
    }
}
