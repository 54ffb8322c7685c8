//! Normalizer: engine payloads to [`NormalizedIssue`]s.
//!
//! Each [`RawPayload`] variant has exactly one mapping function, matched
//! exhaustively in [`normalize_payload`]. Fingerprints are computed here and
//! nowhere else. A payload that does not match its shape yields a
//! [`NormalizationError`]; [`normalize_result`] records it on the unit, empties
//! the unit's issues and marks it errored without touching other units.

mod axe;
mod criteria;
mod lighthouse;
mod messages;
mod wave;

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::error::NormalizationError;
use crate::domain::fingerprint::{fingerprint, normalize_selector};
use crate::domain::model::{
    Evidence, ExecutionUnit, NormalizedIssue, Outcome, RawPayload, RawResult, ResultStatus,
    Severity, UnitError,
};
use crate::domain::wcag::{self, WcagLevel};
use crate::obs;

/// A unit after normalization: terminal status plus its issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedUnit {
    pub unit: ExecutionUnit,
    pub status: ResultStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<UnitError>,
    /// Set when the payload could not be normalized.
    pub normalization_error: Option<String>,
    pub issues: Vec<NormalizedIssue>,
}

/// Map one payload to normalized issues on behalf of `adapter`.
pub fn normalize_payload(
    adapter: &str,
    payload: &RawPayload,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    match payload {
        RawPayload::Axe(value) => axe::normalize(adapter, value),
        RawPayload::Wave(value) => wave::normalize(adapter, value),
        RawPayload::Pa11y(value) => messages::normalize_pa11y(adapter, value),
        RawPayload::Htmlcs(value) => messages::normalize_htmlcs(adapter, value),
        RawPayload::W3c(value) => messages::normalize_w3c(adapter, value),
        RawPayload::W3cCss(value) => messages::normalize_w3c_css(adapter, value),
        RawPayload::Lighthouse(value) => lighthouse::normalize(adapter, value),
        RawPayload::Criteria(report) => Ok(criteria::normalize(adapter, report)),
    }
}

/// Normalize one terminal unit result. Consumes the result.
pub fn normalize_result(result: RawResult) -> NormalizedUnit {
    let RawResult {
        unit,
        status,
        payload,
        duration_ms,
        attempts,
        error,
    } = result;

    let mut normalized = NormalizedUnit {
        unit,
        status,
        attempts,
        duration_ms,
        error,
        normalization_error: None,
        issues: Vec::new(),
    };
    if status != ResultStatus::Ok {
        return normalized;
    }

    let outcome = match &payload {
        Some(payload) => normalize_payload(&normalized.unit.adapter, payload),
        None => Err(NormalizationError::Empty {
            adapter: normalized.unit.adapter.clone(),
        }),
    };
    match outcome {
        Ok(issues) => normalized.issues = issues,
        Err(err) => {
            obs::emit_normalize_error(&normalized.unit, &err);
            normalized.status = ResultStatus::Error;
            normalized.normalization_error = Some(err.to_string());
        }
    }
    normalized
}

/// Normalize every result. One unit's failure never affects another.
pub fn normalize_all(results: Vec<RawResult>) -> Vec<NormalizedUnit> {
    results.into_iter().map(normalize_result).collect()
}

/// Deserialize a payload body into its expected shape.
pub(crate) fn parse_shape<T: DeserializeOwned>(
    adapter: &str,
    value: &serde_json::Value,
) -> Result<T, NormalizationError> {
    T::deserialize(value).map_err(|e| NormalizationError::ShapeMismatch {
        adapter: adapter.to_string(),
        detail: e.to_string(),
    })
}

pub(crate) fn shape_mismatch(adapter: &str, detail: impl Into<String>) -> NormalizationError {
    NormalizationError::ShapeMismatch {
        adapter: adapter.to_string(),
        detail: detail.into(),
    }
}

/// Accept either a JSON array of entries or an object wrapping one under `key`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListOrWrapped<T> {
    List(Vec<T>),
    Wrapped(std::collections::BTreeMap<String, serde_json::Value>),
}

pub(crate) fn entries<T: DeserializeOwned>(
    adapter: &str,
    value: &serde_json::Value,
    key: &str,
) -> Result<Vec<T>, NormalizationError> {
    match parse_shape::<ListOrWrapped<T>>(adapter, value)? {
        ListOrWrapped::List(items) => Ok(items),
        ListOrWrapped::Wrapped(map) => match map.get(key) {
            Some(inner) => parse_shape(adapter, inner),
            None => Err(shape_mismatch(
                adapter,
                format!("expected an array or an object with `{key}`"),
            )),
        },
    }
}

/// Partially built issue, finished by [`IssueDraft::build`].
#[derive(Debug, Clone)]
pub(crate) struct IssueDraft {
    rule_id: String,
    outcome: Outcome,
    severity: Severity,
    criteria: BTreeSet<String>,
    level_hint: Option<WcagLevel>,
    description: String,
    selector: String,
    evidence: Vec<Evidence>,
}

impl IssueDraft {
    pub(crate) fn new(rule_id: impl Into<String>, outcome: Outcome, severity: Severity) -> Self {
        Self {
            rule_id: rule_id.into(),
            outcome,
            severity,
            criteria: BTreeSet::new(),
            level_hint: None,
            description: String::new(),
            selector: String::new(),
            evidence: Vec::new(),
        }
    }

    pub(crate) fn criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.extend(criteria.into_iter().map(Into::into));
        self
    }

    /// Level to use when none of the criteria is in the WCAG table.
    pub(crate) fn level_hint(mut self, level: Option<WcagLevel>) -> Self {
        self.level_hint = level;
        self
    }

    pub(crate) fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub(crate) fn evidence(mut self, label: &str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.trim().is_empty() {
            self.evidence.push(Evidence::new(label, detail));
        }
        self
    }

    pub(crate) fn evidence_list(mut self, evidence: &[Evidence]) -> Self {
        self.evidence.extend(evidence.iter().cloned());
        self
    }

    pub(crate) fn build(self, adapter: &str) -> NormalizedIssue {
        let level = wcag::lowest_level(&self.criteria).or(self.level_hint);
        let element_selector = normalize_selector(&self.selector);
        NormalizedIssue {
            fingerprint: fingerprint(adapter, &self.rule_id, &element_selector, level),
            source_adapter: adapter.to_string(),
            rule_id: self.rule_id,
            severity: self.severity,
            wcag_criteria: self.criteria,
            wcag_level: level,
            outcome: self.outcome,
            description: self.description,
            element_selector,
            evidence: self.evidence,
        }
    }
}
