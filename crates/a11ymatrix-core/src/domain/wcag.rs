//! WCAG 2.2 success-criterion table and tag parsing.
//!
//! Engines name criteria in different ways:
//! - axe-core tags: `wcag111`, `wcag1410`, plus level tags such as `wcag2aa`
//! - HTML_CodeSniffer / pa11y codes: `WCAG2AA.Principle1.Guideline1_1.1_1_1.H37`
//!
//! Both are mapped onto dotted criterion ids (`1.1.1`) whose conformance level
//! comes from [`criterion`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// WCAG conformance level. Ordered `A < AA < AAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WcagLevel {
    A,
    AA,
    AAA,
}

impl WcagLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WcagLevel::A => "A",
            WcagLevel::AA => "AA",
            WcagLevel::AAA => "AAA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(WcagLevel::A),
            "AA" => Some(WcagLevel::AA),
            "AAA" => Some(WcagLevel::AAA),
            _ => None,
        }
    }
}

impl fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the success-criterion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessCriterion {
    pub id: &'static str,
    pub title: &'static str,
    pub level: WcagLevel,
}

const fn sc(id: &'static str, title: &'static str, level: WcagLevel) -> SuccessCriterion {
    SuccessCriterion { id, title, level }
}

use WcagLevel::{A, AA, AAA};

/// WCAG 2.2 success criteria. `4.1.1 Parsing` is obsolete in 2.2 but kept so
/// markup-validity findings still carry a level.
pub const SUCCESS_CRITERIA: &[SuccessCriterion] = &[
    sc("1.1.1", "Non-text Content", A),
    sc("1.2.1", "Audio-only and Video-only (Prerecorded)", A),
    sc("1.2.2", "Captions (Prerecorded)", A),
    sc("1.2.3", "Audio Description or Media Alternative (Prerecorded)", A),
    sc("1.2.4", "Captions (Live)", AA),
    sc("1.2.5", "Audio Description (Prerecorded)", AA),
    sc("1.2.6", "Sign Language (Prerecorded)", AAA),
    sc("1.2.7", "Extended Audio Description (Prerecorded)", AAA),
    sc("1.2.8", "Media Alternative (Prerecorded)", AAA),
    sc("1.2.9", "Audio-only (Live)", AAA),
    sc("1.3.1", "Info and Relationships", A),
    sc("1.3.2", "Meaningful Sequence", A),
    sc("1.3.3", "Sensory Characteristics", A),
    sc("1.3.4", "Orientation", AA),
    sc("1.3.5", "Identify Input Purpose", AA),
    sc("1.3.6", "Identify Purpose", AAA),
    sc("1.4.1", "Use of Color", A),
    sc("1.4.2", "Audio Control", A),
    sc("1.4.3", "Contrast (Minimum)", AA),
    sc("1.4.4", "Resize Text", AA),
    sc("1.4.5", "Images of Text", AA),
    sc("1.4.6", "Contrast (Enhanced)", AAA),
    sc("1.4.7", "Low or No Background Audio", AAA),
    sc("1.4.8", "Visual Presentation", AAA),
    sc("1.4.9", "Images of Text (No Exception)", AAA),
    sc("1.4.10", "Reflow", AA),
    sc("1.4.11", "Non-text Contrast", AA),
    sc("1.4.12", "Text Spacing", AA),
    sc("1.4.13", "Content on Hover or Focus", AA),
    sc("2.1.1", "Keyboard", A),
    sc("2.1.2", "No Keyboard Trap", A),
    sc("2.1.3", "Keyboard (No Exception)", AAA),
    sc("2.1.4", "Character Key Shortcuts", A),
    sc("2.2.1", "Timing Adjustable", A),
    sc("2.2.2", "Pause, Stop, Hide", A),
    sc("2.2.3", "No Timing", AAA),
    sc("2.2.4", "Interruptions", AAA),
    sc("2.2.5", "Re-authenticating", AAA),
    sc("2.2.6", "Timeouts", AAA),
    sc("2.3.1", "Three Flashes or Below Threshold", A),
    sc("2.3.2", "Three Flashes", AAA),
    sc("2.3.3", "Animation from Interactions", AAA),
    sc("2.4.1", "Bypass Blocks", A),
    sc("2.4.2", "Page Titled", A),
    sc("2.4.3", "Focus Order", A),
    sc("2.4.4", "Link Purpose (In Context)", A),
    sc("2.4.5", "Multiple Ways", AA),
    sc("2.4.6", "Headings and Labels", AA),
    sc("2.4.7", "Focus Visible", AA),
    sc("2.4.8", "Location", AAA),
    sc("2.4.9", "Link Purpose (Link Only)", AAA),
    sc("2.4.10", "Section Headings", AAA),
    sc("2.4.11", "Focus Not Obscured (Minimum)", AA),
    sc("2.4.12", "Focus Not Obscured (Enhanced)", AAA),
    sc("2.4.13", "Focus Appearance", AAA),
    sc("2.5.1", "Pointer Gestures", A),
    sc("2.5.2", "Pointer Cancellation", A),
    sc("2.5.3", "Label in Name", A),
    sc("2.5.4", "Motion Actuation", A),
    sc("2.5.5", "Target Size (Enhanced)", AAA),
    sc("2.5.6", "Concurrent Input Mechanisms", AAA),
    sc("2.5.7", "Dragging Movements", AA),
    sc("2.5.8", "Target Size (Minimum)", AA),
    sc("3.1.1", "Language of Page", A),
    sc("3.1.2", "Language of Parts", AA),
    sc("3.1.3", "Unusual Words", AAA),
    sc("3.1.4", "Abbreviations", AAA),
    sc("3.1.5", "Reading Level", AAA),
    sc("3.1.6", "Pronunciation", AAA),
    sc("3.2.1", "On Focus", A),
    sc("3.2.2", "On Input", A),
    sc("3.2.3", "Consistent Navigation", AA),
    sc("3.2.4", "Consistent Identification", AA),
    sc("3.2.5", "Change on Request", AAA),
    sc("3.2.6", "Consistent Help", A),
    sc("3.3.1", "Error Identification", A),
    sc("3.3.2", "Labels or Instructions", A),
    sc("3.3.3", "Error Suggestion", AA),
    sc("3.3.4", "Error Prevention (Legal, Financial, Data)", AA),
    sc("3.3.5", "Help", AAA),
    sc("3.3.6", "Error Prevention (All)", AAA),
    sc("3.3.7", "Redundant Entry", A),
    sc("3.3.8", "Accessible Authentication (Minimum)", AA),
    sc("3.3.9", "Accessible Authentication (Enhanced)", AAA),
    sc("4.1.1", "Parsing", A),
    sc("4.1.2", "Name, Role, Value", A),
    sc("4.1.3", "Status Messages", AA),
];

/// Look up a success criterion by dotted id.
pub fn criterion(id: &str) -> Option<&'static SuccessCriterion> {
    SUCCESS_CRITERIA.iter().find(|c| c.id == id)
}

/// Lowest conformance level among the given criteria, if any is known.
pub fn lowest_level<'a, I>(criteria: I) -> Option<WcagLevel>
where
    I: IntoIterator<Item = &'a String>,
{
    criteria
        .into_iter()
        .filter_map(|id| criterion(id).map(|c| c.level))
        .min()
}

/// Guideline part of a criterion id: `1.4.10` -> `1.4`.
pub fn guideline_of(id: &str) -> Option<&str> {
    let mut dots = id.match_indices('.');
    dots.next()?;
    match dots.next() {
        Some((idx, _)) => Some(&id[..idx]),
        None => None,
    }
}

fn axe_sc_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^wcag(\d)(\d)(\d{1,2})$").ok()).as_ref()
}

fn axe_level_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^wcag2\d?(a{1,3})$").ok()).as_ref()
}

fn sniffer_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\.)(\d)_(\d{1,2})_(\d{1,2})(?:\.|$)").ok()
    })
    .as_ref()
}

/// Criterion ids named by axe-core tags. Unknown tags are ignored.
pub fn criteria_from_axe_tags<S: AsRef<str>>(tags: &[S]) -> BTreeSet<String> {
    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_ref().trim().to_ascii_lowercase();
            axe_sc_regex()?
                .captures(&tag)
                .map(|caps| format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
        })
        .collect()
}

/// Conformance level named by axe-core level tags (`wcag2aa`, `wcag21a`, ...).
pub fn level_from_axe_tags<S: AsRef<str>>(tags: &[S]) -> Option<WcagLevel> {
    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_ref().trim().to_ascii_lowercase();
            axe_level_regex()?
                .captures(&tag)
                .and_then(|caps| WcagLevel::parse(&caps[1]))
        })
        .min()
}

/// Criterion id embedded in an HTML_CodeSniffer code, if any.
pub fn criterion_from_sniffer_code(code: &str) -> Option<String> {
    sniffer_regex()?
        .captures(code)
        .map(|caps| format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
}

/// Conformance level named by an HTML_CodeSniffer standard prefix (`WCAG2AA.`).
pub fn level_from_sniffer_code(code: &str) -> Option<WcagLevel> {
    let standard = code.split('.').next()?;
    let suffix = standard.strip_prefix("WCAG2")?;
    WcagLevel::parse(suffix)
}
