//! Stable issue fingerprints.
//!
//! A fingerprint is the SHA-256 hex digest of
//! `(source adapter, rule id, normalized selector, lowest WCAG level)`.
//! No clock, randomness or process state goes into it, so the same finding
//! yields the same fingerprint across runs and restarts.

use sha2::{Digest, Sha256};

use super::wcag::WcagLevel;

const FINGERPRINT_DOMAIN: &str = "a11ymatrix.issue.v1";

/// Normalize a CSS selector (or selector list) for identity comparison.
///
/// Whitespace runs collapse to one space, spaces around combinators and
/// commas are dropped, and selector lists are sorted and deduplicated.
pub fn normalize_selector(selector: &str) -> String {
    let mut parts: Vec<String> = split_selector_list(selector)
        .into_iter()
        .map(|part| normalize_compound(&part))
        .filter(|part| !part.is_empty())
        .collect();
    parts.sort();
    parts.dedup();
    parts.join(",")
}

/// Split a selector list on top-level commas.
pub fn split_selector_list(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '(' | '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, ')' | ']') => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (None, ',') if depth == 0 => parts.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn normalize_compound(selector: &str) -> String {
    let collapsed = selector.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '>' | '+' | '~' => {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push(ch);
                while chars.peek() == Some(&' ') {
                    chars.next();
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Compute the fingerprint for one issue.
pub fn fingerprint(
    source_adapter: &str,
    rule_id: &str,
    element_selector: &str,
    lowest_level: Option<WcagLevel>,
) -> String {
    let level = lowest_level.map(|l| l.as_str()).unwrap_or("none");
    let selector = normalize_selector(element_selector);

    let mut hasher = Sha256::new();
    for part in [
        FINGERPRINT_DOMAIN,
        source_adapter,
        rule_id,
        selector.as_str(),
        level,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_whitespace_and_combinators() {
        assert_eq!(
            normalize_selector("  main   >  ul li +  a "),
            "main>ul li+a".to_string()
        );
        assert_eq!(normalize_selector("div ~ p"), "div~p");
    }

    #[test]
    fn selector_lists_sorted_and_deduped() {
        assert_eq!(normalize_selector("#b, #a ,#b"), "#a,#b");
        assert_eq!(
            normalize_selector("a[title='x, y'], b"),
            "a[title='x, y'],b"
        );
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("axe", "image-alt", "img.hero", Some(WcagLevel::A));
        let b = fingerprint("axe", "image-alt", " img.hero ", Some(WcagLevel::A));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_separates_inputs() {
        let base = fingerprint("axe", "image-alt", "img", Some(WcagLevel::A));
        assert_ne!(base, fingerprint("pa11y", "image-alt", "img", Some(WcagLevel::A)));
        assert_ne!(base, fingerprint("axe", "label", "img", Some(WcagLevel::A)));
        assert_ne!(base, fingerprint("axe", "image-alt", "svg", Some(WcagLevel::A)));
        assert_ne!(base, fingerprint("axe", "image-alt", "img", Some(WcagLevel::AA)));
        assert_ne!(base, fingerprint("axe", "image-alt", "img", None));
        // field boundaries are delimited
        assert_ne!(
            fingerprint("ab", "c", "", None),
            fingerprint("a", "bc", "", None)
        );
    }
}
