//! CI gate rules engine.
//!
//! Evaluates a run's [`SummaryReport`] against a [`GateRuleSet`] to produce a
//! [`GateVerdict`], the pass/fail decision a CI job exits on. Supports
//! per-severity and total failure limits, an adapter error budget, and
//! criteria that must come back clean.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::SummaryReport;
use crate::domain::error::{ConfigError, ConfigResult};
use crate::domain::model::Severity;

// ---------------------------------------------------------------------------
// Gate rules
// ---------------------------------------------------------------------------

/// A single gate rule that can fail a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateRule {
    /// Failed issues of `severity` must not exceed `limit`.
    MaxFailedBySeverity { severity: Severity, limit: usize },
    /// Failed issues of any severity must not exceed `limit`.
    MaxFailedTotal { limit: usize },
    /// Units that failed, timed out or could not be normalized must not exceed `limit`.
    MaxAdapterErrors { limit: usize },
    /// No failed issue may map to WCAG criterion `criterion`.
    RequireCleanCriterion { criterion: String },
}

/// An ordered set of gate rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateRuleSet {
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub rules: Vec<GateRule>,
}

impl GateRuleSet {
    /// No critical or serious failures, no adapter errors.
    pub fn standard() -> Self {
        Self {
            fail_fast: false,
            rules: vec![
                GateRule::MaxFailedBySeverity {
                    severity: Severity::Critical,
                    limit: 0,
                },
                GateRule::MaxFailedBySeverity {
                    severity: Severity::Serious,
                    limit: 0,
                },
                GateRule::MaxAdapterErrors { limit: 0 },
            ],
        }
    }

    /// Add a rule.
    pub fn with_rule(mut self, rule: GateRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Load a rule set from a JSON or TOML file.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|detail| ConfigError::Parse {
            path: path.to_path_buf(),
            detail,
        })
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    /// Which rule was violated.
    pub rule: GateRule,
    /// Human-readable explanation.
    pub reason: String,
}

/// The outcome of evaluating a gate rule set against a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateVerdict {
    /// Violations found (empty when passed).
    pub violations: Vec<Violation>,
}

impl GateVerdict {
    /// Whether the gate passed (i.e., there are no violations).
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate `summary` against `rule_set`.
///
/// When `rule_set.fail_fast` is true, evaluation stops at the first violation.
pub fn evaluate_gate(rule_set: &GateRuleSet, summary: &SummaryReport) -> GateVerdict {
    let mut violations = Vec::new();
    for rule in &rule_set.rules {
        if let Some(v) = check_rule(rule, summary) {
            violations.push(v);
            if rule_set.fail_fast {
                break;
            }
        }
    }
    GateVerdict { violations }
}

fn check_rule(rule: &GateRule, summary: &SummaryReport) -> Option<Violation> {
    let violation = |reason: String| Violation {
        rule: rule.clone(),
        reason,
    };
    match rule {
        GateRule::MaxFailedBySeverity { severity, limit } => {
            let found = summary
                .failed_by_severity
                .get(severity.as_str())
                .copied()
                .unwrap_or(0);
            (found > *limit)
                .then(|| violation(format!("{found} failed {severity} issues > allowed {limit}")))
        }
        GateRule::MaxFailedTotal { limit } => {
            let found = summary.failed();
            (found > *limit).then(|| violation(format!("{found} failed issues > allowed {limit}")))
        }
        GateRule::MaxAdapterErrors { limit } => {
            let errors = summary.errors;
            (errors.total() > *limit).then(|| {
                violation(format!(
                    "{} adapter errors > allowed {limit} (failed {}, timed out {}, normalization {})",
                    errors.total(),
                    errors.failed,
                    errors.timed_out,
                    errors.normalization,
                ))
            })
        }
        GateRule::RequireCleanCriterion { criterion } => {
            let found = summary
                .failed_by_criterion
                .get(criterion)
                .copied()
                .unwrap_or(0);
            (found > 0).then(|| {
                violation(format!("{found} failed issues for WCAG {criterion}, required clean"))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ErrorCounts;

    fn summary() -> SummaryReport {
        let mut s = SummaryReport::default();
        s.totals.issues = 5;
        s.totals
            .by_outcome
            .insert(crate::domain::model::Outcome::Failed, 3);
        s.failed_by_severity.insert("serious".into(), 2);
        s.failed_by_severity.insert("minor".into(), 1);
        s.failed_by_criterion.insert("1.1.1".into(), 2);
        s.errors = ErrorCounts {
            failed: 0,
            timed_out: 1,
            normalization: 0,
        };
        s
    }

    #[test]
    fn standard_rules_flag_serious_and_errors() {
        let verdict = evaluate_gate(&GateRuleSet::standard(), &summary());
        assert!(!verdict.passed());
        assert_eq!(verdict.violations.len(), 2);
        assert!(verdict.violations[0].reason.contains("serious"));
    }

    #[test]
    fn clean_summary_passes() {
        let verdict = evaluate_gate(&GateRuleSet::standard(), &SummaryReport::default());
        assert!(verdict.passed());
    }

    #[test]
    fn fail_fast_stops_at_first() {
        let rules = GateRuleSet::standard().with_fail_fast(true);
        assert_eq!(evaluate_gate(&rules, &summary()).violations.len(), 1);
    }

    #[test]
    fn total_and_criterion_rules() {
        let rules = GateRuleSet::default()
            .with_rule(GateRule::MaxFailedTotal { limit: 3 })
            .with_rule(GateRule::RequireCleanCriterion {
                criterion: "1.1.1".into(),
            })
            .with_rule(GateRule::RequireCleanCriterion {
                criterion: "2.4.7".into(),
            });
        let verdict = evaluate_gate(&rules, &summary());
        assert_eq!(verdict.violations.len(), 1);
        assert!(verdict.violations[0].reason.contains("1.1.1"));
    }

    #[test]
    fn rule_set_loads_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.toml");
        std::fs::write(
            &path,
            r#"
fail_fast = false

[[rules]]
type = "max_failed_by_severity"
severity = "critical"
limit = 0

[[rules]]
type = "require_clean_criterion"
criterion = "2.5.8"
"#,
        )
        .unwrap();
        let rules = GateRuleSet::from_path(&path).unwrap();
        assert_eq!(rules.rules.len(), 2);
        assert_eq!(
            rules.rules[1],
            GateRule::RequireCleanCriterion {
                criterion: "2.5.8".into()
            }
        );
    }
}
