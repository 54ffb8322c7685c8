//! Criterion reports from rule-based adapters.

use super::IssueDraft;
use crate::domain::model::{
    CriteriaReport, CriterionEvaluation, CriterionIssue, CriterionOutcome, NormalizedIssue,
    Outcome, Severity,
};

pub(super) fn normalize(adapter: &str, report: &CriteriaReport) -> Vec<NormalizedIssue> {
    report
        .criteria
        .iter()
        .flat_map(|eval| evaluation_issues(adapter, &report.checklist, eval))
        .collect()
}

fn draft(
    checklist: &str,
    eval: &CriterionEvaluation,
    outcome: Outcome,
    severity: Severity,
) -> IssueDraft {
    IssueDraft::new(eval.id.as_str(), outcome, severity)
        .criteria(eval.wcag.iter().cloned())
        .level_hint(Some(eval.level))
        .evidence("checklist", checklist)
        .evidence("criterion", eval.name.as_str())
}

fn found(
    checklist: &str,
    eval: &CriterionEvaluation,
    outcome: Outcome,
    issue: &CriterionIssue,
) -> IssueDraft {
    let mut d = draft(checklist, eval, outcome, eval.severity)
        .description(issue.message.as_str())
        .selector(issue.selector.as_str());
    if let Some(snippet) = &issue.snippet {
        d = d.evidence("html", snippet.as_str());
    }
    d.evidence_list(&eval.evidence)
}

fn evaluation_issues(
    adapter: &str,
    checklist: &str,
    eval: &CriterionEvaluation,
) -> Vec<NormalizedIssue> {
    match &eval.outcome {
        CriterionOutcome::Passed => vec![draft(
            checklist,
            eval,
            Outcome::Passed,
            Severity::Informational,
        )
        .description(eval.summary.as_str())
        .evidence_list(&eval.evidence)
        .build(adapter)],
        CriterionOutcome::Failed { issues } => issues
            .iter()
            .map(|issue| found(checklist, eval, Outcome::Failed, issue).build(adapter))
            .collect(),
        CriterionOutcome::ManualCheckRequired {
            instructions,
            candidates,
        } => {
            let mut out = vec![draft(
                checklist,
                eval,
                Outcome::Incomplete,
                Severity::Informational,
            )
            .description(instructions.as_str())
            .evidence("summary", eval.summary.as_str())
            .evidence_list(&eval.evidence)
            .build(adapter)];
            out.extend(
                candidates
                    .iter()
                    .map(|c| found(checklist, eval, Outcome::Incomplete, c).build(adapter)),
            );
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Evidence;
    use crate::domain::wcag::WcagLevel;

    fn eval(id: &str, outcome: CriterionOutcome) -> CriterionEvaluation {
        CriterionEvaluation {
            id: id.to_string(),
            name: "Target Size (Minimum)".to_string(),
            wcag: ["2.5.8".to_string()].into_iter().collect(),
            level: WcagLevel::AA,
            severity: Severity::Serious,
            outcome,
            summary: "summary".to_string(),
            evidence: vec![Evidence::new("standard", "WCAG 2.2")],
        }
    }

    fn report(criteria: Vec<CriterionEvaluation>) -> CriteriaReport {
        CriteriaReport {
            checklist: "wcag22".to_string(),
            criteria,
        }
    }

    #[test]
    fn passed_criterion_yields_one_passed_issue() {
        let issues = normalize("wcag22-rules", &report(vec![eval("2.5.8", CriterionOutcome::Passed)]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].outcome, Outcome::Passed);
        assert_eq!(issues[0].severity, Severity::Informational);
        assert_eq!(issues[0].element_selector, "");
        assert_eq!(issues[0].wcag_level, Some(WcagLevel::AA));
    }

    #[test]
    fn failed_criterion_yields_issue_per_element() {
        let outcome = CriterionOutcome::from_issues(vec![
            CriterionIssue::new("button#a", "16x16 target").with_snippet("<button id=\"a\">"),
            CriterionIssue::new("a.tiny", "10x12 target"),
        ]);
        let issues = normalize("wcag22-rules", &report(vec![eval("2.5.8", outcome)]));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.outcome == Outcome::Failed));
        assert!(issues.iter().all(|i| i.severity == Severity::Serious));
        assert_eq!(issues[0].rule_id, "2.5.8");
        assert!(issues[0].evidence.iter().any(|e| e.label == "html"));
        assert_ne!(issues[0].fingerprint, issues[1].fingerprint);
    }

    #[test]
    fn manual_criterion_yields_incomplete_issues() {
        let outcome = CriterionOutcome::ManualCheckRequired {
            instructions: "Check single-pointer alternatives".to_string(),
            candidates: vec![CriterionIssue::new("[draggable=true]", "draggable element")],
        };
        let issues = normalize("wcag22-rules", &report(vec![eval("2.5.7", outcome)]));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.outcome == Outcome::Incomplete));
        assert_eq!(issues[0].severity, Severity::Informational);
        assert_eq!(issues[0].description, "Check single-pointer alternatives");
        assert_eq!(issues[1].severity, Severity::Serious);
    }
}
