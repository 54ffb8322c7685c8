//! WCAG 2.2 checklist (`wcag22-rules`).
//!
//! Covers the success criteria new in WCAG 2.2 that can be judged, at least
//! partly, from a page snapshot:
//! - 2.4.11 Focus Not Obscured (Minimum), 2.4.13 Focus Appearance and
//!   2.5.8 Target Size (Minimum) need rendered geometry and fall back to a
//!   manual check on markup-only snapshots
//! - 2.5.7 Dragging Movements, 3.3.7 Redundant Entry and 3.3.8 Accessible
//!   Authentication (Minimum) work from markup
//! - 3.2.6 Consistent Help lists help mechanisms; consistency across pages
//!   is always a manual check

use std::collections::BTreeSet;

use a11ymatrix_core::{CriterionIssue, ElementBox, Severity, WcagLevel};
use regex::Regex;
use scraper::ElementRef;

use crate::checklist::{Checklist, Criterion, CriterionMeta, Finding};
use crate::error::{RuleError, RuleResult};
use crate::page::{attr_contains, describe, parent, select_within, snippet, text_of, PageView};

pub const CHECKLIST: &str = "wcag22";

/// Minimum target edge, CSS px.
const MIN_TARGET_PX: f64 = 24.0;
/// Minimum focus indicator thickness, CSS px.
const MIN_FOCUS_INDICATOR_PX: f64 = 2.0;

pub fn checklist() -> Checklist {
    Checklist::new(CHECKLIST)
        .with(FocusNotObscured)
        .with(FocusAppearance)
        .with(DraggingMovements)
        .with(TargetSize)
        .with(ConsistentHelp)
        .with(RedundantEntry)
        .with(AccessibleAuthentication)
}

fn issue(el: ElementRef<'_>, message: impl Into<String>) -> CriterionIssue {
    CriterionIssue::new(describe(el), message).with_snippet(snippet(el))
}

fn box_issue(b: &ElementBox, message: impl Into<String>) -> CriterionIssue {
    CriterionIssue::new(b.selector.as_str(), message)
}

fn focusable(layout: &[ElementBox]) -> impl Iterator<Item = &ElementBox> {
    layout.iter().filter(|b| b.focusable)
}

// ---------------------------------------------------------------------------
// 2.4.11 Focus Not Obscured (Minimum)
// ---------------------------------------------------------------------------

static FOCUS_NOT_OBSCURED: CriterionMeta = CriterionMeta {
    id: "2.4.11",
    name: "Focus Not Obscured (Minimum)",
    wcag: &["2.4.11"],
    level: WcagLevel::AA,
    severity: Severity::Serious,
    references: &[],
};

pub struct FocusNotObscured;

impl Criterion for FocusNotObscured {
    fn meta(&self) -> &'static CriterionMeta {
        &FOCUS_NOT_OBSCURED
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let Some(layout) = page.layout() else {
            let sticky = page.count("[style*='position: fixed'], [style*='position:fixed'], [style*='position: sticky'], [style*='position:sticky']")?;
            return Ok(Finding::manual(
                "Tab through the page and confirm no focused component is entirely hidden by sticky headers, footers or overlays.",
                "no layout data",
            )
            .with_evidence("fixed_or_sticky_elements", sticky.to_string()));
        };
        let issues: Vec<CriterionIssue> = focusable(layout)
            .filter(|b| b.obscured_on_focus)
            .map(|b| box_issue(b, "focused component is entirely hidden by author content"))
            .collect();
        let checked = focusable(layout).count();
        let summary = if issues.is_empty() {
            format!("{checked} focusable components remain visible on focus")
        } else {
            format!("{} of {checked} focusable components are hidden on focus", issues.len())
        };
        Ok(Finding::failed(issues, summary))
    }
}

// ---------------------------------------------------------------------------
// 2.4.13 Focus Appearance
// ---------------------------------------------------------------------------

static FOCUS_APPEARANCE: CriterionMeta = CriterionMeta {
    id: "2.4.13",
    name: "Focus Appearance",
    wcag: &["2.4.13"],
    level: WcagLevel::AAA,
    severity: Severity::Moderate,
    references: &[],
};

pub struct FocusAppearance;

fn outline_removed() -> RuleResult<Regex> {
    Regex::new(r"(?i)outline\s*:\s*(none|0)\b")
        .map_err(|e| RuleError::Undetermined(format!("outline pattern: {e}")))
}

impl Criterion for FocusAppearance {
    fn meta(&self) -> &'static CriterionMeta {
        &FOCUS_APPEARANCE
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let outline_none = outline_removed()?;
        let mut issues: Vec<CriterionIssue> = page
            .select("a[style], button[style], input[style], select[style], textarea[style], [tabindex][style]")?
            .into_iter()
            .filter(|el| el.value().attr("style").is_some_and(|s| outline_none.is_match(s)))
            .map(|el| issue(el, "inline style removes the focus outline"))
            .collect();

        let Some(layout) = page.layout() else {
            if !issues.is_empty() {
                let summary = format!("{} components remove the focus outline", issues.len());
                return Ok(Finding::failed(issues, summary));
            }
            return Ok(Finding::manual(
                "Focus each component and confirm the indicator is at least 2 CSS px thick around its perimeter with 3:1 contrast between focused and unfocused states.",
                "no layout data",
            ));
        };

        let mut unknown = Vec::new();
        for b in focusable(layout) {
            match b.focus_indicator_px {
                Some(px) if px < MIN_FOCUS_INDICATOR_PX => issues.push(box_issue(
                    b,
                    format!("focus indicator is {px:.1} CSS px, below {MIN_FOCUS_INDICATOR_PX} CSS px"),
                )),
                Some(_) => {}
                None => unknown.push(box_issue(b, "focus indicator could not be measured")),
            }
        }
        if !issues.is_empty() {
            let summary = format!("{} focus indicators are insufficient", issues.len());
            return Ok(Finding::failed(issues, summary));
        }
        if !unknown.is_empty() {
            let summary = format!("{} focus indicators could not be measured", unknown.len());
            return Ok(Finding::manual(
                "Confirm the listed components show a focus indicator at least 2 CSS px thick.",
                summary,
            )
            .with_candidates(unknown));
        }
        Ok(Finding::passed("all measured focus indicators are sufficient"))
    }
}

// ---------------------------------------------------------------------------
// 2.5.7 Dragging Movements
// ---------------------------------------------------------------------------

static DRAGGING_MOVEMENTS: CriterionMeta = CriterionMeta {
    id: "2.5.7",
    name: "Dragging Movements",
    wcag: &["2.5.7"],
    level: WcagLevel::AA,
    severity: Severity::Serious,
    references: &[],
};

pub struct DraggingMovements;

const DRAGGABLE: &str = "[draggable='true'], .draggable, .ui-draggable, .sortable, .ui-sortable, .slider, .ui-slider, [role='slider'], input[type='range']";
const MOVE_WORDS: [&str; 6] = ["move", "sort", "order", "position", "up", "down"];

impl DraggingMovements {
    fn has_move_control(page: &PageView) -> RuleResult<bool> {
        Ok(page
            .select("button, a.button, [role='button'], input[type='button']")?
            .into_iter()
            .any(|control| {
                let label = format!(
                    "{} {} {}",
                    text_of(control),
                    control.value().attr("aria-label").unwrap_or(""),
                    control.value().attr("value").unwrap_or("")
                )
                .to_lowercase();
                label
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| MOVE_WORDS.contains(&word))
            }))
    }

    fn slider_has_alternative(el: ElementRef<'_>) -> RuleResult<bool> {
        let Some(container) = parent(el) else {
            return Ok(false);
        };
        let inputs = select_within(container, "input[type='number'], input[type='text']")?;
        let steppers = select_within(
            container,
            "button.increment, button.decrement, button.up, button.down, [aria-label*='increase'], [aria-label*='decrease']",
        )?;
        Ok(!inputs.is_empty() || !steppers.is_empty())
    }
}

impl Criterion for DraggingMovements {
    fn meta(&self) -> &'static CriterionMeta {
        &DRAGGING_MOVEMENTS
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let draggable = page.select(DRAGGABLE)?;
        if draggable.is_empty() {
            return Ok(Finding::passed("no draggable elements found"));
        }

        let number_inputs: BTreeSet<&str> = page
            .select("input[type='number'][name]")?
            .into_iter()
            .filter_map(|el| el.value().attr("name"))
            .collect();
        let move_control = Self::has_move_control(page)?;

        let mut issues = Vec::new();
        for el in &draggable {
            let value = el.value();
            let is_range = value.name() == "input" && value.attr("type") == Some("range");
            if is_range {
                let linked = value
                    .attr("name")
                    .is_some_and(|name| number_inputs.contains(name));
                if !linked {
                    issues.push(issue(
                        *el,
                        "range input has no single-pointer alternative such as a linked number field",
                    ));
                }
            } else if value.attr("draggable") == Some("true")
                || attr_contains(*el, "class", "draggable")
                || attr_contains(*el, "class", "sortable")
            {
                if !move_control {
                    issues.push(issue(
                        *el,
                        "draggable element has no detected non-dragging alternative",
                    ));
                }
            } else if !Self::slider_has_alternative(*el)? {
                issues.push(issue(
                    *el,
                    "slider has no adjacent input or step buttons",
                ));
            }
        }

        let summary = if issues.is_empty() {
            format!("{} draggable elements have alternatives", draggable.len())
        } else {
            format!(
                "{} of {} draggable elements lack a non-dragging alternative",
                issues.len(),
                draggable.len()
            )
        };
        Ok(Finding::failed(issues, summary))
    }
}

// ---------------------------------------------------------------------------
// 2.5.8 Target Size (Minimum)
// ---------------------------------------------------------------------------

static TARGET_SIZE: CriterionMeta = CriterionMeta {
    id: "2.5.8",
    name: "Target Size (Minimum)",
    wcag: &["2.5.8"],
    level: WcagLevel::AA,
    severity: Severity::Serious,
    references: &[],
};

pub struct TargetSize;

impl Criterion for TargetSize {
    fn meta(&self) -> &'static CriterionMeta {
        &TARGET_SIZE
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let Some(layout) = page.layout() else {
            let targets = page.count("a[href], button, input:not([type='hidden']), select, textarea, [role='button'], [role='link']")?;
            return Ok(Finding::manual(
                "Measure pointer targets and confirm each is at least 24 by 24 CSS px or has enough spacing from other targets.",
                format!("{targets} targets found without layout data"),
            ));
        };

        let targets: Vec<&ElementBox> = focusable(layout).filter(|b| !b.inline).collect();
        let mut issues = Vec::new();
        let mut unresolved = Vec::new();
        for (i, b) in targets.iter().enumerate() {
            if !undersized(b) {
                continue;
            }
            let others = targets
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, o)| *o);
            match spacing_clear(b, others) {
                Some(true) => {}
                Some(false) => issues.push(box_issue(
                    b,
                    format!(
                        "target is {:.0}x{:.0} CSS px, below {MIN_TARGET_PX:.0}x{MIN_TARGET_PX:.0}, and too close to another target",
                        b.width, b.height
                    ),
                )),
                None => unresolved.push(box_issue(
                    b,
                    format!(
                        "target is {:.0}x{:.0} CSS px; positions are needed to apply the spacing exception",
                        b.width, b.height
                    ),
                )),
            }
        }

        if !issues.is_empty() {
            let summary = format!(
                "{} of {} targets are too small ({} more need manual review)",
                issues.len(),
                targets.len(),
                unresolved.len()
            );
            return Ok(Finding::failed(issues, summary));
        }
        if !unresolved.is_empty() {
            let summary = format!("{} undersized targets without position data", unresolved.len());
            return Ok(Finding::manual(
                "Check that each listed target has a 24 CSS px circle around its center that touches no other target.",
                summary,
            )
            .with_candidates(unresolved));
        }
        Ok(Finding::passed(format!(
            "{} targets meet the size or spacing minimum",
            targets.len()
        )))
    }
}

fn undersized(b: &ElementBox) -> bool {
    b.width < MIN_TARGET_PX || b.height < MIN_TARGET_PX
}

/// Spacing exception: a circle of `MIN_TARGET_PX` diameter centered on the
/// target may not touch another target or another undersized target's
/// circle. `None` when a needed position is missing.
fn spacing_clear<'a>(
    target: &ElementBox,
    others: impl Iterator<Item = &'a ElementBox>,
) -> Option<bool> {
    let radius = MIN_TARGET_PX / 2.0;
    let (cx, cy) = target.center()?;
    for other in others {
        let hit = if undersized(other) {
            let (ox, oy) = other.center()?;
            (ox - cx).hypot(oy - cy) < 2.0 * radius
        } else {
            other.distance_to(cx, cy)? < radius
        };
        if hit {
            return Some(false);
        }
    }
    Some(true)
}

// ---------------------------------------------------------------------------
// 3.2.6 Consistent Help
// ---------------------------------------------------------------------------

static CONSISTENT_HELP: CriterionMeta = CriterionMeta {
    id: "3.2.6",
    name: "Consistent Help",
    wcag: &["3.2.6"],
    level: WcagLevel::A,
    severity: Severity::Minor,
    references: &[],
};

pub struct ConsistentHelp;

const HELP: &str = "a[href^='mailto:'], a[href^='tel:'], a[href*='contact'], a[href*='help'], a[href*='support'], a[href*='faq'], [class*='contact'], [id*='contact'], [class*='help'], [id*='help'], [class*='support'], [id*='support'], [class*='faq'], [id*='faq'], [class*='chat'], [id*='chat'], [aria-label*='chat'], [aria-label*='help'], [aria-label*='support']";

fn help_kind(el: ElementRef<'_>) -> &'static str {
    let href = el.value().attr("href").unwrap_or("").to_lowercase();
    let text = format!(
        "{} {}",
        text_of(el),
        el.value().attr("aria-label").unwrap_or("")
    )
    .to_lowercase();
    if href.starts_with("mailto:") {
        "contact_email"
    } else if href.starts_with("tel:") {
        "contact_phone"
    } else if text.contains("chat") || attr_contains(el, "class", "chat") {
        "automated_chat"
    } else if text.contains("faq") || href.contains("faq") {
        "self_help"
    } else if text.contains("help") || href.contains("help") {
        "help_page"
    } else if text.contains("contact") || href.contains("contact") {
        "contact_page"
    } else {
        "other_help"
    }
}

impl Criterion for ConsistentHelp {
    fn meta(&self) -> &'static CriterionMeta {
        &CONSISTENT_HELP
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let mechanisms = page.select(HELP)?;
        let summary = if mechanisms.is_empty() {
            "no help mechanisms detected on the page".to_string()
        } else {
            format!("{} help mechanisms detected", mechanisms.len())
        };
        let mut finding = Finding::manual(
            "Compare pages of the set: help mechanisms that appear must keep the same relative order on each page.",
            summary,
        );
        for (position, el) in mechanisms.iter().enumerate() {
            finding = finding.with_evidence(
                help_kind(*el),
                format!("#{} {}", position + 1, describe(*el)),
            );
        }
        Ok(finding)
    }
}

// ---------------------------------------------------------------------------
// 3.3.7 Redundant Entry
// ---------------------------------------------------------------------------

static REDUNDANT_ENTRY: CriterionMeta = CriterionMeta {
    id: "3.3.7",
    name: "Redundant Entry",
    wcag: &["3.3.7"],
    level: WcagLevel::A,
    severity: Severity::Moderate,
    references: &[],
};

pub struct RedundantEntry;

struct Field<'a> {
    el: ElementRef<'a>,
    kind: &'a str,
    name: &'a str,
    blocks_fill: bool,
}

impl Criterion for RedundantEntry {
    fn meta(&self) -> &'static CriterionMeta {
        &REDUNDANT_ENTRY
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let forms = page.select("form")?;
        let steps = page.count("[class*='steps'], [id*='steps'], [class*='wizard'], [id*='wizard'], [class*='multi-step'], [id*='multi-step']")?;
        if forms.is_empty() && steps == 0 {
            return Ok(Finding::passed("no forms or multi-step processes detected"));
        }

        let mut issues = Vec::new();
        for form in &forms {
            let fields: Vec<Field<'_>> = select_within(*form, "input")?
                .into_iter()
                .map(|el| Field {
                    el,
                    kind: el.value().attr("type").unwrap_or("text"),
                    name: el.value().attr("name").unwrap_or(""),
                    blocks_fill: el.value().attr("autocomplete") == Some("off")
                        || el.value().attr("readonly").is_some(),
                })
                .collect();
            for (i, first) in fields.iter().enumerate() {
                for second in &fields[i + 1..] {
                    let paired = !first.name.is_empty()
                        && !second.name.is_empty()
                        && (first.name.contains(second.name) || second.name.contains(first.name))
                        && first.kind == second.kind;
                    if paired && second.blocks_fill {
                        issues.push(issue(
                            second.el,
                            format!(
                                "`{}` repeats `{}` and blocks autofill",
                                second.name, first.name
                            ),
                        ));
                    }
                }
            }
        }

        if issues.is_empty() {
            return Ok(Finding::manual(
                "Walk through each multi-step process and confirm information entered earlier is auto-populated or selectable when requested again.",
                format!("{} forms, {steps} step indicators; no blocked re-entry detected", forms.len()),
            ));
        }
        let summary = format!("{} re-entry fields block autofill", issues.len());
        Ok(Finding::failed(issues, summary))
    }
}

// ---------------------------------------------------------------------------
// 3.3.8 Accessible Authentication (Minimum)
// ---------------------------------------------------------------------------

static ACCESSIBLE_AUTHENTICATION: CriterionMeta = CriterionMeta {
    id: "3.3.8",
    name: "Accessible Authentication (Minimum)",
    wcag: &["3.3.8"],
    level: WcagLevel::AA,
    severity: Severity::Serious,
    references: &[],
};

pub struct AccessibleAuthentication;

const AUTH_HINTS: [&str; 3] = ["login", "signin", "auth"];
const CAPTCHA: &str = "[class*='captcha'], [id*='captcha'], iframe[src*='captcha'], .g-recaptcha, .h-captcha";
const ALTERNATIVES: &str = "[class*='sso'], [class*='google'], [class*='facebook'], [class*='webauthn'], [id*='webauthn'], [class*='passkey'], [class*='biometric'], [class*='fingerprint']";

fn is_auth_form(form: ElementRef<'_>) -> RuleResult<bool> {
    let hinted = ["action", "id", "class"]
        .iter()
        .any(|attr| AUTH_HINTS.iter().any(|hint| attr_contains(form, attr, hint)));
    Ok(hinted || !select_within(form, "input[type='password']")?.is_empty())
}

impl Criterion for AccessibleAuthentication {
    fn meta(&self) -> &'static CriterionMeta {
        &ACCESSIBLE_AUTHENTICATION
    }

    fn evaluate(&self, page: &PageView) -> RuleResult<Finding> {
        let mut auth_forms = Vec::new();
        for form in page.select("form")? {
            if is_auth_form(form)? {
                auth_forms.push(form);
            }
        }
        if auth_forms.is_empty() {
            return Ok(Finding::passed("no authentication forms detected"));
        }

        let mut issues = Vec::new();
        let mut candidates = Vec::new();
        for form in &auth_forms {
            let captcha = !select_within(*form, CAPTCHA)?.is_empty();
            let alternative = !select_within(*form, ALTERNATIVES)?.is_empty();
            if captcha && !alternative {
                issues.push(issue(
                    *form,
                    "authentication relies on a CAPTCHA without an alternative method",
                ));
            }
            for pw in select_within(*form, "input[type='password']")? {
                let value = pw.value();
                if value.attr("onpaste").is_some_and(|h| h.contains("return false")) {
                    issues.push(issue(pw, "password field blocks paste from password managers"));
                } else if value.attr("autocomplete") == Some("off") {
                    issues.push(issue(pw, "password field disables autofill"));
                }
            }
            if !captcha {
                candidates.push(issue(*form, "confirm no cognitive function test is required"));
            }
        }

        if !issues.is_empty() {
            let summary = format!("{} authentication barriers detected", issues.len());
            return Ok(Finding::failed(issues, summary));
        }
        Ok(Finding::manual(
            "Confirm every authentication step offers a method that does not rely on remembering, transcribing or solving puzzles.",
            format!("{} authentication forms found", auth_forms.len()),
        )
        .with_candidates(candidates))
    }
}
