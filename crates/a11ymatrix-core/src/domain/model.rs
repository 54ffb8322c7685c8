//! Run, unit and issue types shared by every stage of the pipeline.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{AdapterError, FailureClass};
use super::wcag::WcagLevel;

/// A named browser viewport.
///
/// Deserializes from either a table (`{ name, width, height }`), a
/// `name,width,height` string, or a preset name (`mobile`, `tablet`, `desktop`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "ViewportRepr")]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ViewportRepr {
    Text(String),
    Table { name: String, width: i64, height: i64 },
}

impl TryFrom<ViewportRepr> for ViewportProfile {
    type Error = String;

    fn try_from(repr: ViewportRepr) -> Result<Self, Self::Error> {
        match repr {
            ViewportRepr::Text(text) => Self::parse(&text),
            ViewportRepr::Table {
                name,
                width,
                height,
            } => Self::checked(name, width, height),
        }
    }
}

impl ViewportProfile {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    pub fn mobile() -> Self {
        Self::new("mobile", 375, 667)
    }

    pub fn tablet() -> Self {
        Self::new("tablet", 768, 1024)
    }

    pub fn desktop() -> Self {
        Self::new("desktop", 1366, 768)
    }

    /// Built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mobile" => Some(Self::mobile()),
            "tablet" => Some(Self::tablet()),
            "desktop" => Some(Self::desktop()),
            _ => None,
        }
    }

    /// Parse `name,width,height` or a preset name.
    pub fn parse(text: &str) -> Result<Self, String> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [name] => {
                Self::preset(name).ok_or_else(|| format!("unknown viewport preset `{name}`"))
            }
            [name, width, height] => {
                let width: i64 = width
                    .parse()
                    .map_err(|_| format!("viewport `{name}`: width `{width}` is not a number"))?;
                let height: i64 = height
                    .parse()
                    .map_err(|_| format!("viewport `{name}`: height `{height}` is not a number"))?;
                Self::checked(name.to_string(), width, height)
            }
            _ => Err(format!(
                "viewport `{text}` must be `name,width,height` or a preset name"
            )),
        }
    }

    fn checked(name: String, width: i64, height: i64) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("viewport name must not be empty".to_string());
        }
        if width <= 0 || height <= 0 {
            return Err(format!(
                "viewport `{name}` has non-positive dimensions {width}x{height}"
            ));
        }
        let width = u32::try_from(width).map_err(|_| format!("viewport `{name}`: width too large"))?;
        let height =
            u32::try_from(height).map_err(|_| format!("viewport `{name}`: height too large"))?;
        Ok(Self {
            name,
            width,
            height,
        })
    }
}

impl fmt::Display for ViewportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}x{})", self.name, self.width, self.height)
    }
}

/// One atomic piece of work: run `adapter` against `url` in `browser` at `viewport`.
///
/// Field order gives the derived ordering: URL, then browser, then viewport
/// (by name first), then adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionUnit {
    pub url: String,
    pub browser: String,
    pub viewport: ViewportProfile,
    pub adapter: String,
}

impl ExecutionUnit {
    pub fn new(
        url: impl Into<String>,
        browser: impl Into<String>,
        viewport: ViewportProfile,
        adapter: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            browser: browser.into(),
            viewport,
            adapter: adapter.into(),
        }
    }

    /// The `(url, browser, viewport)` group this unit shares a session with.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            url: self.url.clone(),
            browser: self.browser.clone(),
            viewport: self.viewport.clone(),
        }
    }
}

impl fmt::Display for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {}] {}",
            self.url, self.browser, self.viewport, self.adapter
        )
    }
}

/// Units sharing one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub url: String,
    pub browser: String,
    pub viewport: ViewportProfile,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} {}]", self.url, self.browser, self.viewport)
    }
}

/// Status of a finished unit as seen by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Timeout,
    Error,
}

/// Error detail recorded on a unit that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitError {
    pub kind: String,
    pub class: FailureClass,
    pub message: String,
}

impl From<&AdapterError> for UnitError {
    fn from(err: &AdapterError) -> Self {
        Self {
            kind: err.kind().to_string(),
            class: err.class(),
            message: err.to_string(),
        }
    }
}

/// Supporting evidence attached to an issue or criterion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Evidence {
    pub label: String,
    pub detail: String,
}

impl Evidence {
    pub fn new(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: detail.into(),
        }
    }
}

/// One element that violates or needs review for a criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionIssue {
    pub selector: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl CriterionIssue {
    pub fn new(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            message: message.into(),
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Result of evaluating one fixed criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CriterionOutcome {
    Passed,
    Failed {
        issues: Vec<CriterionIssue>,
    },
    ManualCheckRequired {
        instructions: String,
        #[serde(default)]
        candidates: Vec<CriterionIssue>,
    },
}

impl CriterionOutcome {
    /// `Failed` when any issue was found, `Passed` otherwise.
    pub fn from_issues(issues: Vec<CriterionIssue>) -> Self {
        if issues.is_empty() {
            CriterionOutcome::Passed
        } else {
            CriterionOutcome::Failed { issues }
        }
    }

    pub fn manual(instructions: impl Into<String>) -> Self {
        CriterionOutcome::ManualCheckRequired {
            instructions: instructions.into(),
            candidates: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CriterionOutcome::Failed { .. })
    }
}

/// One criterion's evaluation as reported by a rule-based adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
    /// Checklist-specific criterion id (`2.5.8`, `ja-lang`).
    pub id: String,
    pub name: String,
    pub wcag: BTreeSet<String>,
    pub level: WcagLevel,
    /// Severity assigned to violations of this criterion.
    pub severity: Severity,
    pub outcome: CriterionOutcome,
    pub summary: String,
    /// Supporting mechanisms discovered on the page.
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// All criteria evaluated by one checklist against one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaReport {
    pub checklist: String,
    pub criteria: Vec<CriterionEvaluation>,
}

/// Adapter-specific payload, tagged by the engine that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum RawPayload {
    /// axe-core results: `violations`, `passes`, `incomplete`, `inapplicable`.
    Axe(serde_json::Value),
    /// WAVE API response with per-category counts.
    Wave(serde_json::Value),
    /// pa11y JSON reporter output.
    Pa11y(serde_json::Value),
    /// HTML_CodeSniffer messages.
    Htmlcs(serde_json::Value),
    /// Nu HTML Checker messages.
    W3c(serde_json::Value),
    /// W3C CSS validator `cssvalidation` block.
    W3cCss(serde_json::Value),
    /// Lighthouse report restricted to the accessibility category.
    Lighthouse(serde_json::Value),
    /// Fixed-criterion evaluation.
    Criteria(CriteriaReport),
}

impl RawPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            RawPayload::Axe(_) => "axe",
            RawPayload::Wave(_) => "wave",
            RawPayload::Pa11y(_) => "pa11y",
            RawPayload::Htmlcs(_) => "htmlcs",
            RawPayload::W3c(_) => "w3c",
            RawPayload::W3cCss(_) => "w3c_css",
            RawPayload::Lighthouse(_) => "lighthouse",
            RawPayload::Criteria(_) => "criteria",
        }
    }
}

/// Terminal record for one execution unit.
///
/// Written once by the scheduler and consumed by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub unit: ExecutionUnit,
    pub status: ResultStatus,
    pub payload: Option<RawPayload>,
    pub duration_ms: u64,
    /// Adapter invocations made, including retries.
    pub attempts: u32,
    pub error: Option<UnitError>,
}

/// Issue severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Serious,
    Moderate,
    Minor,
    Informational,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Serious,
        Severity::Moderate,
        Severity::Minor,
        Severity::Informational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
            Severity::Informational => "informational",
        }
    }

    /// axe-core `impact` values.
    pub fn from_impact(impact: &str) -> Option<Self> {
        match impact.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "serious" => Some(Severity::Serious),
            "moderate" => Some(Severity::Moderate),
            "minor" => Some(Severity::Minor),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an engine concluded about a rule on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Failed,
    Passed,
    Incomplete,
    Inapplicable,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::Failed,
        Outcome::Passed,
        Outcome::Incomplete,
        Outcome::Inapplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Failed => "failed",
            Outcome::Passed => "passed",
            Outcome::Incomplete => "incomplete",
            Outcome::Inapplicable => "inapplicable",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An engine finding in the common issue model.
///
/// Built only by the normalizer, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIssue {
    pub fingerprint: String,
    pub source_adapter: String,
    pub rule_id: String,
    pub severity: Severity,
    pub wcag_criteria: BTreeSet<String>,
    pub wcag_level: Option<WcagLevel>,
    pub outcome: Outcome,
    pub description: String,
    pub element_selector: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_parse_forms() {
        let vp = ViewportProfile::parse("desktop,1280,800").unwrap();
        assert_eq!(vp, ViewportProfile::new("desktop", 1280, 800));

        let vp = ViewportProfile::parse("mobile").unwrap();
        assert_eq!(vp, ViewportProfile::new("mobile", 375, 667));

        let err = ViewportProfile::parse("tiny,0,600").unwrap_err();
        assert!(err.contains("non-positive"));

        let err = ViewportProfile::parse("tiny,-5,600").unwrap_err();
        assert!(err.contains("tiny"));

        assert!(ViewportProfile::parse("a,b").is_err());
        assert!(ViewportProfile::parse("watch").is_err());
    }

    #[test]
    fn viewport_deserializes_from_string_and_table() {
        let vps: Vec<ViewportProfile> = serde_json::from_value(serde_json::json!([
            "tablet",
            "wide,1920,1080",
            {"name": "narrow", "width": 320, "height": 640}
        ]))
        .unwrap();
        assert_eq!(vps[0], ViewportProfile::tablet());
        assert_eq!(vps[1], ViewportProfile::new("wide", 1920, 1080));
        assert_eq!(vps[2], ViewportProfile::new("narrow", 320, 640));

        let bad: Result<ViewportProfile, _> =
            serde_json::from_value(serde_json::json!({"name": "x", "width": 0, "height": 10}));
        assert!(bad.is_err());
    }

    #[test]
    fn unit_ordering_is_url_browser_viewport_adapter() {
        let desktop = ViewportProfile::desktop();
        let mobile = ViewportProfile::mobile();
        let mut units = vec![
            ExecutionUnit::new("https://b.test", "chromium", desktop.clone(), "axe"),
            ExecutionUnit::new("https://a.test", "firefox", desktop.clone(), "axe"),
            ExecutionUnit::new("https://a.test", "chromium", mobile.clone(), "axe"),
            ExecutionUnit::new("https://a.test", "chromium", desktop.clone(), "wave"),
            ExecutionUnit::new("https://a.test", "chromium", desktop.clone(), "axe"),
        ];
        units.sort();
        let order: Vec<String> = units.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "https://a.test [chromium desktop(1366x768)] axe",
                "https://a.test [chromium desktop(1366x768)] wave",
                "https://a.test [chromium mobile(375x667)] axe",
                "https://a.test [firefox desktop(1366x768)] axe",
                "https://b.test [chromium desktop(1366x768)] axe",
            ]
        );
    }

    #[test]
    fn criterion_outcome_from_issues() {
        assert_eq!(CriterionOutcome::from_issues(vec![]), CriterionOutcome::Passed);
        let outcome = CriterionOutcome::from_issues(vec![CriterionIssue::new("#a", "too small")]);
        assert!(outcome.is_failed());
    }

    #[test]
    fn raw_payload_is_tagged() {
        let payload = RawPayload::Axe(serde_json::json!({"violations": []}));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "axe");
        let back: RawPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), "axe");
    }

    #[test]
    fn severity_orders_most_severe_first() {
        assert!(Severity::Critical < Severity::Informational);
        assert_eq!(Severity::from_impact("Serious"), Some(Severity::Serious));
        assert_eq!(Severity::from_impact("none"), None);
    }
}
