//! axe-core results: four categorized rule lists.
//!
//! Accepts a single results object or the array `axe` CLI prints (one object
//! per page). Each rule entry becomes one issue whose selector lists every
//! affected node.

use serde::Deserialize;
use serde_json::Value;

use super::{parse_shape, shape_mismatch, IssueDraft};
use crate::domain::error::NormalizationError;
use crate::domain::model::{NormalizedIssue, Outcome, Severity};
use crate::domain::wcag;

#[derive(Debug, Deserialize)]
struct AxeResults {
    #[serde(default)]
    violations: Option<Vec<AxeRule>>,
    #[serde(default)]
    passes: Option<Vec<AxeRule>>,
    #[serde(default)]
    incomplete: Option<Vec<AxeRule>>,
    #[serde(default)]
    inapplicable: Option<Vec<AxeRule>>,
}

#[derive(Debug, Deserialize)]
struct AxeRule {
    id: String,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    help: String,
    #[serde(default, rename = "helpUrl")]
    help_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    nodes: Vec<AxeNode>,
}

#[derive(Debug, Deserialize)]
struct AxeNode {
    #[serde(default)]
    target: Vec<Value>,
    #[serde(default)]
    html: String,
    #[serde(default, rename = "failureSummary")]
    failure_summary: Option<String>,
}

impl AxeNode {
    /// Flatten axe's target (nested arrays for frames and shadow roots).
    fn selector(&self) -> String {
        self.target
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                Value::Array(inner) => inner
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub(super) fn normalize(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let pages: Vec<AxeResults> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| parse_shape(adapter, item))
            .collect::<Result<_, _>>()?,
        Value::Object(_) => vec![parse_shape(adapter, value)?],
        _ => return Err(shape_mismatch(adapter, "expected an axe results object")),
    };

    let mut issues = Vec::new();
    for page in pages {
        let categories = [
            (page.violations, Outcome::Failed),
            (page.passes, Outcome::Passed),
            (page.incomplete, Outcome::Incomplete),
            (page.inapplicable, Outcome::Inapplicable),
        ];
        if categories.iter().all(|(rules, _)| rules.is_none()) {
            return Err(shape_mismatch(
                adapter,
                "none of violations/passes/incomplete/inapplicable present",
            ));
        }
        for (rules, outcome) in categories {
            for rule in rules.unwrap_or_default() {
                issues.push(rule_issue(adapter, rule, outcome));
            }
        }
    }
    Ok(issues)
}

fn rule_issue(adapter: &str, rule: AxeRule, outcome: Outcome) -> NormalizedIssue {
    let severity = match outcome {
        Outcome::Failed | Outcome::Incomplete => rule
            .impact
            .as_deref()
            .and_then(Severity::from_impact)
            .unwrap_or(Severity::Moderate),
        Outcome::Passed | Outcome::Inapplicable => Severity::Informational,
    };
    let description = if rule.help.is_empty() {
        rule.description.clone()
    } else {
        rule.help.clone()
    };
    let selector = rule
        .nodes
        .iter()
        .map(AxeNode::selector)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let mut draft = IssueDraft::new(rule.id.as_str(), outcome, severity)
        .criteria(wcag::criteria_from_axe_tags(&rule.tags))
        .level_hint(wcag::level_from_axe_tags(&rule.tags))
        .description(description)
        .selector(selector)
        .evidence("rule", rule.description.as_str());
    if let Some(url) = &rule.help_url {
        draft = draft.evidence("help_url", url.as_str());
    }
    for node in &rule.nodes {
        draft = draft.evidence("html", node.html.as_str());
        if let Some(summary) = &node.failure_summary {
            draft = draft.evidence("failure_summary", summary.as_str());
        }
    }
    draft.build(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "violations": [{
                "id": "image-alt",
                "impact": "critical",
                "description": "Ensures <img> elements have alternate text",
                "help": "Images must have alternate text",
                "tags": ["cat.text-alternatives", "wcag2a", "wcag111"],
                "nodes": [
                    {"target": ["img.hero"], "html": "<img class=\"hero\">"},
                    {"target": [["iframe#ads", "img"]], "html": "<img>"}
                ]
            }, {
                "id": "color-contrast",
                "impact": null,
                "help": "Elements must have sufficient color contrast",
                "tags": ["wcag2aa", "wcag143"],
                "nodes": [{"target": ["p.muted"], "html": "<p class=\"muted\">"}]
            }],
            "passes": [{"id": "html-has-lang", "impact": null, "tags": ["wcag2a", "wcag311"], "nodes": []}],
            "incomplete": [],
            "inapplicable": [{"id": "video-caption", "tags": ["wcag2a", "wcag122"], "nodes": []}]
        })
    }

    #[test]
    fn maps_each_entry_to_one_issue() {
        let issues = normalize("axe", &sample()).unwrap();
        assert_eq!(issues.len(), 4);

        let alt = &issues[0];
        assert_eq!(alt.rule_id, "image-alt");
        assert_eq!(alt.outcome, Outcome::Failed);
        assert_eq!(alt.severity, Severity::Critical);
        assert!(alt.wcag_criteria.contains("1.1.1"));
        assert_eq!(alt.element_selector, "iframe#ads img,img.hero");
        assert_eq!(alt.evidence.iter().filter(|e| e.label == "html").count(), 2);

        let contrast = &issues[1];
        assert_eq!(contrast.severity, Severity::Moderate);

        assert_eq!(issues[2].outcome, Outcome::Passed);
        assert_eq!(issues[2].severity, Severity::Informational);
        assert_eq!(issues[3].outcome, Outcome::Inapplicable);
    }

    #[test]
    fn accepts_cli_array() {
        let issues = normalize("axe", &json!([sample()])).unwrap();
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(normalize("axe", &json!({"foo": 1})).is_err());
        assert!(normalize("axe", &json!("text")).is_err());
        assert!(normalize("axe", &json!({"violations": [{"impact": "minor"}]})).is_err());
    }

    #[test]
    fn fingerprints_are_stable() {
        let a: Vec<String> = normalize("axe", &sample())
            .unwrap()
            .into_iter()
            .map(|i| i.fingerprint)
            .collect();
        let b: Vec<String> = normalize("axe", &sample())
            .unwrap()
            .into_iter()
            .map(|i| i.fingerprint)
            .collect();
        assert_eq!(a, b);
    }
}
