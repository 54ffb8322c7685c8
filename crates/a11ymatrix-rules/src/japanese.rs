//! Japanese-locale checklist (`japanese-a11y`).
//!
//! Checks that matter for Japanese pages, mapped to WCAG and to the matching
//! JIS X 8341-3:2016 clauses. Typography checks read inline styles only;
//! computed styles are out of reach of a markup snapshot.

use a11ymatrix_core::{CriterionIssue, Severity, WcagLevel};
use regex::Regex;
use scraper::ElementRef;

use crate::checklist::{Checklist, Criterion, CriterionMeta, Finding};
use crate::error::{RuleError, RuleResult};
use crate::page::{describe, has_ancestor, snippet, PageView};

pub const CHECKLIST: &str = "japanese";

const MIN_FONT_PX: f64 = 12.0;
const MIN_FONT_PT: f64 = 9.0;
const MIN_LINE_HEIGHT: f64 = 1.5;
/// Share of Japanese characters above which a page counts as Japanese.
const JAPANESE_SHARE: f64 = 0.3;
/// Kanji count and kanji share of Japanese text above which readings are expected.
const DENSE_KANJI_COUNT: usize = 50;
const DENSE_KANJI_SHARE: f64 = 0.4;

pub fn checklist() -> Checklist {
    Checklist::new(CHECKLIST)
        .with(PageLanguage)
        .with(CharacterEncoding)
        .with(RubyAnnotations)
        .with(FontSize)
        .with(LineHeight)
        .with(FormLabels)
}

fn issue(el: ElementRef<'_>, message: impl Into<String>) -> CriterionIssue {
    CriterionIssue::new(describe(el), message).with_snippet(snippet(el))
}

fn pattern(re: &str) -> RuleResult<Regex> {
    Regex::new(re).map_err(|e| RuleError::Undetermined(format!("pattern `{re}`: {e}")))
}

pub fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}')
}

pub fn is_kanji(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

/// Character counts for a block of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextProfile {
    pub letters: usize,
    pub kana: usize,
    pub kanji: usize,
}

impl TextProfile {
    pub fn of(text: &str) -> Self {
        let mut profile = Self::default();
        for c in text.chars().filter(|c| c.is_alphanumeric()) {
            profile.letters += 1;
            if is_kana(c) {
                profile.kana += 1;
            } else if is_kanji(c) {
                profile.kanji += 1;
            }
        }
        profile
    }

    pub fn japanese(&self) -> usize {
        self.kana + self.kanji
    }

    pub fn japanese_share(&self) -> f64 {
        ratio(self.japanese(), self.letters)
    }

    pub fn kanji_share(&self) -> f64 {
        ratio(self.kanji, self.japanese())
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

static PAGE_LANGUAGE: CriterionMeta = CriterionMeta {
    id: "ja-lang",
    name: "Page language declared as Japanese",
    wcag: &["3.1.1"],
    level: WcagLevel::A,
    severity: Severity::Serious,
    references: &["JIS X 8341-3:2016 7.3.1.1"],
};

pub struct PageLanguage;

impl Criterion for PageLanguage {
    fn meta(&self) -> &'static CriterionMeta {
        &PAGE_LANGUAGE
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let html = page.first("html")?.ok_or(RuleError::MissingElement("html"))?;
        let lang = html.value().attr("lang").map(str::trim).unwrap_or("");
        if lang.is_empty() {
            return Ok(Finding::failed(
                vec![CriterionIssue::new("html", "html element has no lang attribute")],
                "page language is not declared",
            ));
        }
        if lang.to_ascii_lowercase().starts_with("ja") {
            return Ok(Finding::passed(format!("page declares lang=\"{lang}\"")));
        }

        let profile = TextProfile::of(&page.body_text()?);
        let share = profile.japanese_share();
        if share >= JAPANESE_SHARE {
            return Ok(Finding::failed(
                vec![CriterionIssue::new(
                    "html",
                    format!("lang=\"{lang}\" but {:.0}% of the text is Japanese", share * 100.0),
                )],
                "declared language does not match the content",
            ));
        }
        Ok(Finding::passed(format!(
            "page declares lang=\"{lang}\" and is not predominantly Japanese"
        )))
    }
}

// ---------------------------------------------------------------------------
// Character encoding
// ---------------------------------------------------------------------------

static CHARACTER_ENCODING: CriterionMeta = CriterionMeta {
    id: "ja-encoding",
    name: "Character encoding declared",
    wcag: &["3.1.1"],
    level: WcagLevel::A,
    severity: Severity::Minor,
    references: &["JIS X 8341-3:2016 7.3.1.1"],
};

pub struct CharacterEncoding;

const LEGACY_ENCODINGS: [&str; 8] = [
    "shift_jis",
    "shift-jis",
    "sjis",
    "x-sjis",
    "windows-31j",
    "cp932",
    "euc-jp",
    "iso-2022-jp",
];

/// `charset` parameter of a `Content-Type` value.
pub fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

fn canonical(label: &str) -> &str {
    match label {
        "utf8" => "utf-8",
        other => other,
    }
}

impl Criterion for CharacterEncoding {
    fn meta(&self) -> &'static CriterionMeta {
        &CHARACTER_ENCODING
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let mut declared: Vec<(String, String)> = Vec::new();
        if let Some(charset) = page.content_type().and_then(charset_param) {
            declared.push(("head".to_string(), charset));
        }
        for meta in page.select("meta[charset]")? {
            if let Some(charset) = meta.value().attr("charset") {
                declared.push((describe(meta), charset.trim().to_ascii_lowercase()));
            }
        }
        for meta in page.select("meta[http-equiv][content]")? {
            let is_content_type = meta
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("content-type"));
            if let Some(charset) = meta
                .value()
                .attr("content")
                .filter(|_| is_content_type)
                .and_then(charset_param)
            {
                declared.push((describe(meta), charset));
            }
        }

        if declared.is_empty() {
            return Ok(Finding::failed(
                vec![CriterionIssue::new(
                    "head",
                    "no character encoding declared in headers or markup",
                )],
                "character encoding is not declared",
            ));
        }

        let mut issues = Vec::new();
        for (selector, label) in &declared {
            let label = canonical(label);
            if label == "utf-8" {
                continue;
            }
            let message = if LEGACY_ENCODINGS.contains(&label) {
                format!("legacy encoding `{label}`; UTF-8 is recommended")
            } else {
                format!("unrecognized encoding `{label}`")
            };
            issues.push(CriterionIssue::new(selector.as_str(), message));
        }
        let first = canonical(&declared[0].1);
        if declared.iter().any(|(_, l)| canonical(l) != first) {
            issues.push(CriterionIssue::new(
                "head",
                "headers and markup declare different encodings",
            ));
        }

        let summary = declared
            .iter()
            .map(|(selector, label)| format!("{label} via {selector}"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Finding::failed(issues, summary))
    }
}

// ---------------------------------------------------------------------------
// Ruby annotations
// ---------------------------------------------------------------------------

static RUBY_ANNOTATIONS: CriterionMeta = CriterionMeta {
    id: "ja-ruby",
    name: "Readings provided for dense kanji",
    wcag: &["3.1.6"],
    level: WcagLevel::AAA,
    severity: Severity::Minor,
    references: &["JIS X 8341-3:2016 7.3.1.6"],
};

pub struct RubyAnnotations;

impl Criterion for RubyAnnotations {
    fn meta(&self) -> &'static CriterionMeta {
        &RUBY_ANNOTATIONS
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let profile = TextProfile::of(&page.body_text()?);
        if profile.japanese() == 0 {
            return Ok(Finding::passed("no Japanese text"));
        }
        let share = profile.kanji_share();
        if profile.kanji < DENSE_KANJI_COUNT || share < DENSE_KANJI_SHARE {
            return Ok(Finding::passed(format!(
                "{} kanji, {:.0}% of Japanese text",
                profile.kanji,
                share * 100.0
            )));
        }
        let ruby = page.count("ruby")?;
        if ruby > 0 {
            return Ok(Finding::passed(format!("{ruby} ruby annotations for dense kanji"))
                .with_evidence("ruby_annotations", ruby.to_string()));
        }
        Ok(Finding::manual(
            "Dense kanji text has no ruby annotations. Check whether readings are needed for the intended audience.",
            format!("{} kanji, {:.0}% of Japanese text, no ruby", profile.kanji, share * 100.0),
        ))
    }
}

// ---------------------------------------------------------------------------
// Typography
// ---------------------------------------------------------------------------

static FONT_SIZE: CriterionMeta = CriterionMeta {
    id: "ja-font-size",
    name: "Minimum font size",
    wcag: &["1.4.4"],
    level: WcagLevel::AA,
    severity: Severity::Moderate,
    references: &["JIS X 8341-3:2016 7.1.4.4"],
};

pub struct FontSize;

/// `font-size` in px from an inline style, when given in px or pt.
pub fn font_size_px(style: &str, re: &Regex) -> Option<f64> {
    let caps = re.captures(style)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2)?.as_str().to_ascii_lowercase().as_str() {
        "px" => Some(value),
        "pt" => Some(value * MIN_FONT_PX / MIN_FONT_PT),
        _ => None,
    }
}

fn font_size_pattern() -> RuleResult<Regex> {
    pattern(r"(?i)font-size\s*:\s*([0-9]*\.?[0-9]+)\s*(px|pt)\b")
}

impl Criterion for FontSize {
    fn meta(&self) -> &'static CriterionMeta {
        &FONT_SIZE
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let re = font_size_pattern()?;
        let styled = page.select("[style]")?;
        let issues: Vec<CriterionIssue> = styled
            .iter()
            .filter_map(|el| {
                let px = font_size_px(el.value().attr("style")?, &re)?;
                (px < MIN_FONT_PX).then(|| {
                    issue(*el, format!("fixed font size {px:.1}px is below {MIN_FONT_PX}px"))
                })
            })
            .collect();
        let summary = if issues.is_empty() {
            "no inline font sizes below 12px".to_string()
        } else {
            format!("{} elements use font sizes below 12px", issues.len())
        };
        Ok(Finding::failed(issues, summary))
    }
}

static LINE_HEIGHT: CriterionMeta = CriterionMeta {
    id: "ja-line-height",
    name: "Line height",
    wcag: &["1.4.12"],
    level: WcagLevel::AA,
    severity: Severity::Minor,
    references: &["JIS X 8341-3:2016 7.1.4.8"],
};

pub struct LineHeight;

/// Line height as a multiple of the font size, from an inline style.
pub fn line_height_ratio(style: &str, line_re: &Regex, font_re: &Regex) -> Option<f64> {
    let caps = line_re.captures(style)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    match unit.as_deref() {
        None | Some("em") | Some("rem") => Some(value),
        Some("%") => Some(value / 100.0),
        Some("px") => font_size_px(style, font_re).filter(|fs| *fs > 0.0).map(|fs| value / fs),
        Some(_) => None,
    }
}

impl Criterion for LineHeight {
    fn meta(&self) -> &'static CriterionMeta {
        &LINE_HEIGHT
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let line_re = pattern(r"(?i)line-height\s*:\s*([0-9]*\.?[0-9]+)\s*(px|em|rem|%)?")?;
        let font_re = font_size_pattern()?;
        let issues: Vec<CriterionIssue> = page
            .select("[style]")?
            .into_iter()
            .filter_map(|el| {
                let ratio = line_height_ratio(el.value().attr("style")?, &line_re, &font_re)?;
                (ratio < MIN_LINE_HEIGHT).then(|| {
                    issue(el, format!("line height {ratio:.2} is below {MIN_LINE_HEIGHT}"))
                })
            })
            .collect();
        let summary = if issues.is_empty() {
            "no inline line heights below 1.5".to_string()
        } else {
            format!("{} elements set line heights below 1.5", issues.len())
        };
        Ok(Finding::failed(issues, summary))
    }
}

// ---------------------------------------------------------------------------
// Form labels
// ---------------------------------------------------------------------------

static FORM_LABELS: CriterionMeta = CriterionMeta {
    id: "ja-form-labels",
    name: "Form fields have labels",
    wcag: &["3.3.2"],
    level: WcagLevel::A,
    severity: Severity::Serious,
    references: &["JIS X 8341-3:2016 7.3.3.2"],
};

pub struct FormLabels;

const UNLABELLED_TYPES: [&str; 5] = ["hidden", "submit", "reset", "button", "image"];

impl Criterion for FormLabels {
    fn meta(&self) -> &'static CriterionMeta {
        &FORM_LABELS
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let label_targets: Vec<&str> = page
            .select("label[for]")?
            .into_iter()
            .filter_map(|l| l.value().attr("for"))
            .collect();
        let fields = page.select("input, select, textarea")?;
        let mut checked = 0;
        let mut issues = Vec::new();
        for field in fields {
            let value = field.value();
            let kind = value.attr("type").unwrap_or("text").to_ascii_lowercase();
            if value.name() == "input" && UNLABELLED_TYPES.contains(&kind.as_str()) {
                continue;
            }
            checked += 1;
            let labelled = value.id().is_some_and(|id| label_targets.contains(&id))
                || ["aria-label", "aria-labelledby", "title"]
                    .iter()
                    .any(|a| value.attr(a).is_some_and(|v| !v.trim().is_empty()))
                || has_ancestor(field, "label");
            if labelled {
                continue;
            }
            let message = if value.attr("placeholder").is_some() {
                "field is labelled by placeholder only"
            } else {
                "field has no label"
            };
            issues.push(issue(field, message));
        }
        let summary = if issues.is_empty() {
            format!("{checked} form fields are labelled")
        } else {
            format!("{} of {checked} form fields lack labels", issues.len())
        };
        Ok(Finding::failed(issues, summary))
    }
}
