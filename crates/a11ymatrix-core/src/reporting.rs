//! Report artifacts for CI and PR comments.

use std::path::Path;

use anyhow::{Context, Result};

use crate::aggregate::RunReport;
use crate::domain::model::{Outcome, Severity};
use crate::gate::GateVerdict;

/// Write the full run report as pretty JSON.
pub fn write_run_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a Markdown summary of `report`, with the gate verdict when given.
pub fn render_summary_md(report: &RunReport, verdict: Option<&GateVerdict>) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    out.push_str("# Accessibility Summary\n\n");
    out.push_str(&format!(
        "- run: `{}`\n- urls: {}\n- units: {}\n- issues: {}\n- adapter errors: {}\n- cross-tool links: {}\n\n",
        report.run_id,
        summary.urls,
        summary.units,
        summary.totals.issues,
        summary.total_errors(),
        summary.cross_tool_links,
    ));

    out.push_str("## Outcomes\n");
    for outcome in Outcome::ALL {
        out.push_str(&format!("- {}: {}\n", outcome, summary.totals.outcome(outcome)));
    }
    out.push('\n');

    out.push_str("## Failed by Severity\n");
    for severity in Severity::ALL {
        let n = summary
            .failed_by_severity
            .get(severity.as_str())
            .copied()
            .unwrap_or(0);
        out.push_str(&format!("- {}: {}\n", severity, n));
    }
    out.push('\n');

    if !summary.failed_by_criterion.is_empty() {
        out.push_str("## Failed by WCAG Criterion\n");
        for (criterion, n) in &summary.failed_by_criterion {
            out.push_str(&format!("- `{}`: {}\n", criterion, n));
        }
        out.push('\n');
    }

    if summary.total_errors() > 0 {
        out.push_str("## Adapter Errors\n");
        for (adapter, errors) in &summary.errors_by_adapter {
            if errors.total() == 0 {
                continue;
            }
            out.push_str(&format!(
                "- {}: failed {}, timed out {}, normalization {}\n",
                adapter, errors.failed, errors.timed_out, errors.normalization
            ));
        }
        out.push('\n');
    }

    if let Some(verdict) = verdict {
        out.push_str("## Gate\n");
        if verdict.passed() {
            out.push_str("- passed\n");
        } else {
            for v in &verdict.violations {
                out.push_str(&format!("- {}\n", v.reason));
            }
        }
    }
    out
}

/// Write the Markdown summary.
pub fn write_summary_md(
    path: &Path,
    report: &RunReport,
    verdict: Option<&GateVerdict>,
) -> Result<()> {
    let md = render_summary_md(report, verdict);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SummaryReport;
    use crate::gate::{GateRule, Violation};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn report() -> RunReport {
        let at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("parse RFC3339")
            .with_timezone(&Utc);
        let mut report = RunReport::new(
            Uuid::parse_str("11111111-1111-1111-1111-111111111111").expect("valid UUID"),
            at,
            at,
            Vec::new(),
        );
        let mut summary = SummaryReport::default();
        summary.totals.issues = 1;
        summary.totals.by_outcome.insert(Outcome::Failed, 1);
        summary.failed_by_severity.insert("serious".into(), 1);
        summary.failed_by_criterion.insert("2.5.8".into(), 1);
        report.summary = summary;
        report
    }

    #[test]
    fn run_report_json_has_expected_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        write_run_report_json(&path, &report()).expect("write report");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        let obj = raw.as_object().expect("report object");
        for key in ["run_id", "started_at", "finished_at", "duration_ms", "url_reports", "summary"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(raw["summary"]["totals"]["by_outcome"]["failed"], 1);
    }

    #[test]
    fn summary_markdown_render_is_stable() {
        let verdict = GateVerdict {
            violations: vec![Violation {
                rule: GateRule::MaxFailedTotal { limit: 0 },
                reason: "1 failed issues > allowed 0".into(),
            }],
        };
        let actual = render_summary_md(&report(), Some(&verdict));
        let expected = "# Accessibility Summary\n\n- run: `11111111-1111-1111-1111-111111111111`\n- urls: 0\n- units: 0\n- issues: 1\n- adapter errors: 0\n- cross-tool links: 0\n\n## Outcomes\n- failed: 1\n- passed: 0\n- incomplete: 0\n- inapplicable: 0\n\n## Failed by Severity\n- critical: 0\n- serious: 1\n- moderate: 0\n- minor: 0\n- informational: 0\n\n## Failed by WCAG Criterion\n- `2.5.8`: 1\n\n## Gate\n- 1 failed issues > allowed 0\n";
        assert_eq!(actual, expected);
    }
}
