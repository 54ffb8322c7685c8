//! Lighthouse reports (`--output=json --only-categories=accessibility`).
//!
//! Each accessibility audit becomes one issue. A binary `score` of 1 passes
//! and 0 fails; a `null` score means the audit did not apply. Audits flagged
//! `manual` or `error` need a reviewer and map to incomplete.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use super::{parse_shape, IssueDraft};
use crate::domain::error::NormalizationError;
use crate::domain::model::{NormalizedIssue, Outcome, Severity};

#[derive(Debug, Deserialize)]
struct LighthouseReport {
    audits: BTreeMap<String, Audit>,
    #[serde(default)]
    categories: BTreeMap<String, Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default, rename = "auditRefs")]
    audit_refs: Vec<AuditRef>,
}

#[derive(Debug, Deserialize)]
struct AuditRef {
    id: String,
    #[serde(default)]
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct Audit {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, rename = "scoreDisplayMode")]
    score_display_mode: String,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default)]
    details: Option<Details>,
}

#[derive(Debug, Default, Deserialize)]
struct Details {
    #[serde(default)]
    items: Vec<DetailItem>,
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(default)]
    node: Option<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    selector: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    explanation: String,
}

impl Audit {
    fn outcome(&self) -> Outcome {
        match (self.score_display_mode.as_str(), self.score) {
            ("notApplicable", _) => Outcome::Inapplicable,
            ("manual" | "error", _) => Outcome::Incomplete,
            (_, None) => Outcome::Inapplicable,
            (_, Some(score)) if score >= 1.0 => Outcome::Passed,
            (_, Some(_)) => Outcome::Failed,
        }
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.details
            .iter()
            .flat_map(|d| d.items.iter())
            .filter_map(|item| item.node.as_ref())
    }
}

/// Lighthouse weights accessibility audits by axe impact.
fn severity_from_weight(weight: Option<f64>) -> Severity {
    match weight {
        Some(w) if w >= 10.0 => Severity::Critical,
        Some(w) if w >= 7.0 => Severity::Serious,
        Some(w) if w >= 3.0 => Severity::Moderate,
        Some(w) if w > 0.0 => Severity::Minor,
        _ => Severity::Moderate,
    }
}

/// WCAG criteria for Lighthouse accessibility audits (axe rule ids).
fn audit_criteria(audit_id: &str) -> &'static [&'static str] {
    match audit_id {
        "image-alt" | "input-image-alt" | "object-alt" | "area-alt" | "svg-img-alt"
        | "role-img-alt" => &["1.1.1"],
        "button-name" | "aria-command-name" | "aria-toggle-field-name" | "aria-input-field-name"
        | "aria-meter-name" | "aria-progressbar-name" | "aria-tooltip-name"
        | "aria-treeitem-name" | "frame-title" | "select-name" => &["4.1.2"],
        "label" | "form-field-multiple-labels" => &["1.3.1", "4.1.2"],
        "link-name" => &["2.4.4", "4.1.2"],
        "color-contrast" => &["1.4.3"],
        "document-title" => &["2.4.2"],
        "html-has-lang" | "html-lang-valid" => &["3.1.1"],
        "valid-lang" => &["3.1.2"],
        "bypass" => &["2.4.1"],
        "meta-viewport" => &["1.4.4"],
        "meta-refresh" => &["2.2.1"],
        "tabindex" => &["2.4.3"],
        "list" | "listitem" | "definition-list" | "dlitem" | "td-headers-attr"
        | "th-has-data-cells" | "heading-order" => &["1.3.1"],
        "duplicate-id-aria" | "aria-allowed-attr" | "aria-required-attr"
        | "aria-required-children" | "aria-required-parent" | "aria-roles"
        | "aria-valid-attr" | "aria-valid-attr-value" | "aria-hidden-body"
        | "aria-hidden-focus" => &["4.1.2"],
        "video-caption" => &["1.2.2"],
        "target-size" => &["2.5.8"],
        _ => &[],
    }
}

pub(super) fn normalize(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let report: LighthouseReport = parse_shape(adapter, value)?;

    let refs = report
        .categories
        .get("accessibility")
        .map(|c| &c.audit_refs)
        .filter(|refs| !refs.is_empty());
    let selected: Vec<(&str, Option<f64>)> = match refs {
        Some(refs) => {
            let mut seen = BTreeSet::new();
            refs.iter()
                .filter(|r| seen.insert(r.id.as_str()))
                .map(|r| (r.id.as_str(), Some(r.weight)))
                .collect()
        }
        None => report.audits.keys().map(|k| (k.as_str(), None)).collect(),
    };

    let mut issues = Vec::new();
    for (key, weight) in selected {
        let Some(audit) = report.audits.get(key) else {
            continue;
        };
        let audit_id = if audit.id.is_empty() { key } else { audit.id.as_str() };
        let outcome = audit.outcome();
        let severity = match outcome {
            Outcome::Failed | Outcome::Incomplete => severity_from_weight(weight),
            Outcome::Passed | Outcome::Inapplicable => Severity::Informational,
        };
        let selector = audit
            .nodes()
            .map(|n| n.selector.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let mut draft = IssueDraft::new(audit_id, outcome, severity)
            .criteria(audit_criteria(audit_id).iter().copied())
            .description(audit.title.as_str())
            .selector(selector)
            .evidence("audit", audit.description.as_str());
        if let Some(message) = &audit.error_message {
            draft = draft.evidence("error", message.as_str());
        }
        for node in audit.nodes() {
            draft = draft
                .evidence("html", node.snippet.as_str())
                .evidence("explanation", node.explanation.as_str());
        }
        issues.push(draft.build(adapter));
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> Value {
        json!({
            "categories": {"accessibility": {"score": 0.82, "auditRefs": [
                {"id": "image-alt", "weight": 10},
                {"id": "color-contrast", "weight": 7},
                {"id": "document-title", "weight": 7},
                {"id": "video-caption", "weight": 10},
                {"id": "logical-tab-order", "weight": 0}
            ]}},
            "audits": {
                "image-alt": {
                    "id": "image-alt", "title": "Image elements do not have `[alt]` attributes",
                    "score": 0, "scoreDisplayMode": "binary",
                    "details": {"type": "table", "items": [
                        {"node": {"selector": "img.hero", "snippet": "<img class=\"hero\">"}},
                        {"node": {"selector": "img#logo", "snippet": "<img id=\"logo\">"}}
                    ]}
                },
                "color-contrast": {"id": "color-contrast", "title": "Contrast", "score": 1, "scoreDisplayMode": "binary"},
                "document-title": {"id": "document-title", "title": "Title", "score": 1, "scoreDisplayMode": "binary"},
                "video-caption": {"id": "video-caption", "title": "Captions", "score": null, "scoreDisplayMode": "notApplicable"},
                "logical-tab-order": {"id": "logical-tab-order", "title": "Tab order", "score": null, "scoreDisplayMode": "manual"},
                "first-contentful-paint": {"id": "first-contentful-paint", "score": 0.4, "scoreDisplayMode": "numeric"}
            }
        })
    }

    #[test]
    fn scores_map_to_outcomes() {
        let issues = normalize("lighthouse", &report()).unwrap();
        let outcome = |id: &str| issues.iter().find(|i| i.rule_id == id).map(|i| i.outcome);
        assert_eq!(issues.len(), 5);
        assert_eq!(outcome("image-alt"), Some(Outcome::Failed));
        assert_eq!(outcome("color-contrast"), Some(Outcome::Passed));
        assert_eq!(outcome("video-caption"), Some(Outcome::Inapplicable));
        assert_eq!(outcome("logical-tab-order"), Some(Outcome::Incomplete));
        assert_eq!(outcome("first-contentful-paint"), None);
    }

    #[test]
    fn failed_audit_carries_nodes_and_weight() {
        let issues = normalize("lighthouse", &report()).unwrap();
        let alt = issues.iter().find(|i| i.rule_id == "image-alt").unwrap();
        assert_eq!(alt.severity, Severity::Critical);
        assert_eq!(alt.element_selector, "img#logo,img.hero");
        assert!(alt.wcag_criteria.contains("1.1.1"));
        assert_eq!(alt.evidence.iter().filter(|e| e.label == "html").count(), 2);
    }

    #[test]
    fn null_score_without_refs_is_inapplicable() {
        let issues = normalize(
            "lighthouse",
            &json!({"audits": {"bypass": {"title": "Skip link", "score": null, "scoreDisplayMode": "informative"}}}),
        )
        .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "bypass");
        assert_eq!(issues[0].outcome, Outcome::Inapplicable);
    }

    #[test]
    fn missing_audits_is_shape_error() {
        assert!(normalize("lighthouse", &json!({"categories": {}})).is_err());
    }
}
