//! Flat message lists: pa11y, HTML_CodeSniffer, the Nu HTML Checker and the
//! W3C CSS validator.

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{entries, parse_shape, IssueDraft};
use crate::domain::error::NormalizationError;
use crate::domain::model::{NormalizedIssue, Outcome, Severity};
use crate::domain::wcag;

fn message_level(kind: &str) -> Option<(Outcome, Severity)> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "error" => Some((Outcome::Failed, Severity::Serious)),
        "warning" => Some((Outcome::Incomplete, Severity::Moderate)),
        "notice" => Some((Outcome::Incomplete, Severity::Informational)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// pa11y
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Pa11yIssue {
    code: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    selector: String,
    #[serde(default)]
    runner: Option<String>,
}

pub(super) fn normalize_pa11y(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let items: Vec<Pa11yIssue> = entries(adapter, value, "issues")?;
    Ok(items
        .into_iter()
        .map(|item| {
            let (outcome, severity) =
                message_level(&item.kind).unwrap_or((Outcome::Incomplete, Severity::Minor));
            let mut draft = IssueDraft::new(item.code.as_str(), outcome, severity)
                .criteria(wcag::criterion_from_sniffer_code(&item.code))
                .level_hint(wcag::level_from_sniffer_code(&item.code))
                .description(item.message.as_str())
                .selector(item.selector.as_str());
            if let Some(context) = &item.context {
                draft = draft.evidence("html", context.as_str());
            }
            if let Some(runner) = &item.runner {
                draft = draft.evidence("runner", runner.as_str());
            }
            draft.build(adapter)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// HTML_CodeSniffer
// ---------------------------------------------------------------------------

/// HTMLCS message type: numeric (`1` error, `2` warning, `3` notice) or named.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnifferType {
    Code(u8),
    Name(String),
}

impl SnifferType {
    fn level(&self) -> (Outcome, Severity) {
        let named = match self {
            SnifferType::Code(1) => "error",
            SnifferType::Code(2) => "warning",
            SnifferType::Code(3) => "notice",
            SnifferType::Code(_) => "",
            SnifferType::Name(name) => name.as_str(),
        };
        message_level(named).unwrap_or((Outcome::Incomplete, Severity::Minor))
    }
}

#[derive(Debug, Deserialize)]
struct SnifferMessage {
    #[serde(rename = "type")]
    kind: SnifferType,
    code: String,
    #[serde(default, alias = "message")]
    msg: String,
    #[serde(default, alias = "element")]
    selector: String,
    #[serde(default, rename = "elementHTML", alias = "context")]
    element_html: Option<String>,
}

pub(super) fn normalize_htmlcs(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let items: Vec<SnifferMessage> = entries(adapter, value, "messages")?;
    Ok(items
        .into_iter()
        .map(|item| {
            let (outcome, severity) = item.kind.level();
            let mut draft = IssueDraft::new(item.code.as_str(), outcome, severity)
                .criteria(wcag::criterion_from_sniffer_code(&item.code))
                .level_hint(wcag::level_from_sniffer_code(&item.code))
                .description(item.msg.as_str())
                .selector(item.selector.as_str());
            if let Some(html) = &item.element_html {
                draft = draft.evidence("html", html.as_str());
            }
            draft.build(adapter)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Nu HTML Checker
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NuResponse {
    messages: Vec<NuMessage>,
}

#[derive(Debug, Deserialize)]
struct NuMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, rename = "subType")]
    sub_type: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default, rename = "lastLine")]
    last_line: Option<u64>,
    #[serde(default, rename = "firstColumn")]
    first_column: Option<u64>,
    #[serde(default, rename = "lastColumn")]
    last_column: Option<u64>,
}

impl NuMessage {
    fn location(&self) -> String {
        match (self.last_line, self.first_column, self.last_column) {
            (Some(line), Some(first), Some(last)) => format!("L{line}:C{first}-{last}"),
            (Some(line), _, Some(col)) | (Some(line), Some(col), None) => {
                format!("L{line}:C{col}")
            }
            (Some(line), None, None) => format!("L{line}"),
            _ => String::new(),
        }
    }

    /// Nu messages carry no rule code; derive one from the message text.
    fn rule_id(&self) -> String {
        let digest = Sha256::digest(self.message.trim().as_bytes());
        format!("nu:{}", &hex::encode(digest)[..12])
    }
}

pub(super) fn normalize_w3c(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let response: NuResponse = parse_shape(adapter, value)?;
    Ok(response
        .messages
        .into_iter()
        .map(|msg| {
            let (outcome, severity) = match (msg.kind.as_str(), msg.sub_type.as_deref()) {
                ("error", _) => (Outcome::Failed, Severity::Moderate),
                ("info", Some("warning")) => (Outcome::Incomplete, Severity::Minor),
                _ => (Outcome::Incomplete, Severity::Informational),
            };
            let mut draft = IssueDraft::new(msg.rule_id(), outcome, severity)
                .criteria(["4.1.1"])
                .description(msg.message.as_str())
                .selector(msg.location());
            if let Some(extract) = &msg.extract {
                draft = draft.evidence("extract", extract.as_str());
            }
            draft.build(adapter)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// W3C CSS validator
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CssResponse {
    cssvalidation: CssValidation,
}

#[derive(Debug, Deserialize)]
struct CssValidation {
    #[serde(default)]
    errors: Vec<CssMessage>,
    #[serde(default)]
    warnings: Vec<CssMessage>,
}

#[derive(Debug, Deserialize)]
struct CssMessage {
    #[serde(default)]
    source: String,
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    context: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

impl CssMessage {
    fn rule_id(&self) -> String {
        let kind = self.kind.trim();
        if kind.is_empty() {
            let digest = Sha256::digest(self.message.trim().as_bytes());
            format!("css:{}", &hex::encode(digest)[..12])
        } else {
            format!("css:{kind}")
        }
    }

    fn selector(&self) -> String {
        let context = self.context.trim();
        match self.line {
            Some(line) if context.is_empty() => format!("L{line}"),
            Some(line) => format!("{context} L{line}"),
            None => context.to_string(),
        }
    }

    fn build(&self, adapter: &str, outcome: Outcome, severity: Severity) -> NormalizedIssue {
        IssueDraft::new(self.rule_id(), outcome, severity)
            .description(self.message.trim())
            .selector(self.selector())
            .evidence("stylesheet", self.source.as_str())
            .build(adapter)
    }
}

pub(super) fn normalize_w3c_css(
    adapter: &str,
    value: &Value,
) -> Result<Vec<NormalizedIssue>, NormalizationError> {
    let response: CssResponse = parse_shape(adapter, value)?;
    let validation = response.cssvalidation;
    let errors = validation
        .errors
        .iter()
        .map(|m| m.build(adapter, Outcome::Failed, Severity::Minor));
    let warnings = validation
        .warnings
        .iter()
        .map(|m| m.build(adapter, Outcome::Incomplete, Severity::Informational));
    Ok(errors.chain(warnings).collect())
}
