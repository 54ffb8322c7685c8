//! WAVE API responses: per-category counts with optional item detail.
//!
//! Every counted item becomes one issue so that the number of issues in a
//! category always equals the category's reported `count`. Item detail is
//! used while it lasts; the remainder is synthesized from the category.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{parse_shape, IssueDraft};
use crate::domain::error::NormalizationError;
use crate::domain::model::{NormalizedIssue, Outcome, Severity};

#[derive(Debug, Deserialize)]
struct WaveResponse {
    categories: BTreeMap<String, WaveCategory>,
}

#[derive(Debug, Deserialize)]
struct WaveCategory {
    #[serde(default)]
    description: String,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    items: BTreeMap<String, WaveItem>,
}

#[derive(Debug, Deserialize)]
struct WaveItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    selectors: Vec<Value>,
}

fn category_outcome(category: &str) -> (Outcome, Severity) {
    match category {
        "error" | "contrast" => (Outcome::Failed, Severity::Serious),
        "alert" => (Outcome::Incomplete, Severity::Moderate),
        "feature" | "structure" | "aria" | "html5" => (Outcome::Passed, Severity::Informational),
        _ => (Outcome::Incomplete, Severity::Minor),
    }
}

/// WCAG criteria for common WAVE item ids.
fn item_criteria(item_id: &str) -> &'static [&'static str] {
    match item_id {
        "alt_missing" | "alt_spacer_missing" | "alt_input_missing" | "alt_area_missing"
        | "alt_map_missing" => &["1.1.1"],
        "alt_link_missing" => &["1.1.1", "2.4.4"],
        "label_missing" | "label_empty" | "label_multiple" => &["1.3.1", "3.3.2"],
        "language_missing" => &["3.1.1"],
        "title_invalid" => &["2.4.2"],
        "link_empty" | "link_redundant" => &["2.4.4"],
        "button_empty" => &["1.1.1", "4.1.2"],
        "heading_empty" | "heading_skipped" | "th_empty" | "table_layout" => &["1.3.1"],
        "contrast" => &["1.4.3"],
        "region_missing" | "heading_missing" => &["2.4.1"],
        _ => &[],
    }
}

pub(super) fn normalize(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let response: WaveResponse = parse_shape(adapter, value)?;

    let mut issues = Vec::new();
    for (name, category) in &response.categories {
        let (outcome, severity) = category_outcome(name);
        let total = usize::try_from(category.count).unwrap_or(usize::MAX);
        let mut produced = 0usize;

        'items: for (key, item) in &category.items {
            let item_id = if item.id.is_empty() { key } else { &item.id };
            let item_count = usize::try_from(item.count).unwrap_or(usize::MAX);
            for index in 0..item_count {
                if produced == total {
                    break 'items;
                }
                let selector = match item.selectors.get(index) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                issues.push(
                    IssueDraft::new(item_id.as_str(), outcome, severity)
                        .criteria(item_criteria(item_id).iter().copied())
                        .description(item.description.as_str())
                        .selector(selector)
                        .evidence("category", name.as_str())
                        .build(adapter),
                );
                produced += 1;
            }
        }

        while produced < total {
            issues.push(
                IssueDraft::new(name.as_str(), outcome, severity)
                    .criteria(item_criteria(name).iter().copied())
                    .description(category.description.as_str())
                    .evidence("category", name.as_str())
                    .evidence("synthesized", "count reported without item detail")
                    .build(adapter),
            );
            produced += 1;
        }
    }
    Ok(issues)
}
