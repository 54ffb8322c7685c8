//! Cross-tool linking.
//!
//! Issues from different adapters that point at the same element with a
//! criterion in the same WCAG guideline are linked. Linking never merges:
//! each adapter keeps its own groups and counts, and the link records how
//! many issues every adapter contributed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::report::ScopeReport;
use crate::domain::fingerprint::split_selector_list;
use crate::domain::model::Outcome;
use crate::domain::wcag;

/// The same element and guideline reported by two or more adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossToolLink {
    pub browser: String,
    pub viewport: String,
    pub element_selector: String,
    /// WCAG guideline shared by the linked criteria, e.g. `1.1`.
    pub guideline: String,
    pub criteria: BTreeSet<String>,
    pub adapters: BTreeSet<String>,
    pub issues_by_adapter: BTreeMap<String, usize>,
    pub fingerprints: BTreeSet<String>,
}

type LinkKey = (String, String, String, String);

/// Build links across `scopes` of one URL, and record on every linked group
/// which adapters contributed.
pub(crate) fn link_scopes(scopes: &mut [ScopeReport]) -> Vec<CrossToolLink> {
    let mut links: BTreeMap<LinkKey, CrossToolLink> = BTreeMap::new();

    for scope in scopes.iter() {
        for group in &scope.groups {
            let issue = &group.representative;
            if !matches!(issue.outcome, Outcome::Failed | Outcome::Incomplete)
                || issue.element_selector.is_empty()
            {
                continue;
            }
            let guidelines: BTreeSet<&str> = issue
                .wcag_criteria
                .iter()
                .filter_map(|c| wcag::guideline_of(c))
                .collect();
            for selector in split_selector_list(&issue.element_selector) {
                for guideline in &guidelines {
                    let key = (
                        scope.browser.clone(),
                        scope.viewport.name.clone(),
                        selector.clone(),
                        guideline.to_string(),
                    );
                    let link = links.entry(key).or_insert_with(|| CrossToolLink {
                        browser: scope.browser.clone(),
                        viewport: scope.viewport.name.clone(),
                        element_selector: selector.clone(),
                        guideline: guideline.to_string(),
                        criteria: BTreeSet::new(),
                        adapters: BTreeSet::new(),
                        issues_by_adapter: BTreeMap::new(),
                        fingerprints: BTreeSet::new(),
                    });
                    link.criteria.extend(
                        issue
                            .wcag_criteria
                            .iter()
                            .filter(|c| wcag::guideline_of(c) == Some(*guideline))
                            .cloned(),
                    );
                    link.adapters.insert(scope.adapter.clone());
                    *link
                        .issues_by_adapter
                        .entry(scope.adapter.clone())
                        .or_default() += group.occurrence_count;
                    link.fingerprints.insert(group.fingerprint.clone());
                }
            }
        }
    }

    let links: Vec<CrossToolLink> = links
        .into_values()
        .filter(|l| l.adapters.len() >= 2)
        .collect();

    for link in &links {
        for scope in scopes.iter_mut() {
            if scope.browser != link.browser || scope.viewport.name != link.viewport {
                continue;
            }
            for group in &mut scope.groups {
                if link.fingerprints.contains(&group.fingerprint) {
                    group
                        .contributing_adapters
                        .extend(link.adapters.iter().cloned());
                }
            }
        }
    }
    links
}
