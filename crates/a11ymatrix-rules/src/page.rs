//! Parsed view of a page snapshot.
//!
//! `scraper::Html` is neither `Send` nor `Sync`, so a [`PageView`] is built,
//! evaluated and dropped inside one synchronous call and never held across
//! an `.await`.

use a11ymatrix_core::{ElementBox, PageSnapshot};
use scraper::{ElementRef, Html, Selector};

use crate::error::{RuleError, RuleResult};

const SNIPPET_CHARS: usize = 160;

/// A parsed HTML document plus whatever the session knew about it.
pub struct PageView {
    url: String,
    document: Html,
    content_type: Option<String>,
    layout: Option<Vec<ElementBox>>,
}

impl PageView {
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        Self {
            url: snapshot.url.clone(),
            document: Html::parse_document(&snapshot.html),
            content_type: snapshot.content_type.clone(),
            layout: snapshot.layout.clone(),
        }
    }

    /// A page with markup only, as read from a local file.
    pub fn from_html(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
            content_type: None,
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: Vec<ElementBox>) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// `Content-Type` header value, when the session saw one.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Rendered element geometry. `None` for markup-only snapshots.
    pub fn layout(&self) -> Option<&[ElementBox]> {
        self.layout.as_deref()
    }

    /// Every element matching `css`, in document order.
    pub fn select(&self, css: &str) -> RuleResult<Vec<ElementRef<'_>>> {
        let sel = selector(css)?;
        Ok(self.document.select(&sel).collect())
    }

    pub fn first(&self, css: &str) -> RuleResult<Option<ElementRef<'_>>> {
        let sel = selector(css)?;
        Ok(self.document.select(&sel).next())
    }

    pub fn count(&self, css: &str) -> RuleResult<usize> {
        let sel = selector(css)?;
        Ok(self.document.select(&sel).count())
    }

    /// Text content of `<body>`, whitespace collapsed.
    pub fn body_text(&self) -> RuleResult<String> {
        let body = self.first("body")?.ok_or(RuleError::MissingElement("body"))?;
        Ok(text_of(body))
    }
}

pub fn selector(css: &str) -> RuleResult<Selector> {
    Selector::parse(css).map_err(|e| RuleError::Selector {
        selector: css.to_string(),
        detail: format!("{e:?}"),
    })
}

/// Descendants of `el` matching `css`.
pub fn select_within<'a>(el: ElementRef<'a>, css: &str) -> RuleResult<Vec<ElementRef<'a>>> {
    let sel = selector(css)?;
    Ok(el.select(&sel).collect())
}

/// Short CSS-like locator for an element: `tag#id`, `tag[name=...]` or
/// `tag.class1.class2`.
pub fn describe(el: ElementRef<'_>) -> String {
    let value = el.value();
    let tag = value.name();
    if let Some(id) = value.id().filter(|id| !id.trim().is_empty()) {
        return format!("{tag}#{id}");
    }
    if let Some(name) = value.attr("name").filter(|n| !n.trim().is_empty()) {
        return format!("{tag}[name=\"{name}\"]");
    }
    let classes: Vec<&str> = value.classes().take(2).collect();
    if classes.is_empty() {
        tag.to_string()
    } else {
        format!("{tag}.{}", classes.join("."))
    }
}

/// Outer HTML of `el`, cut to a readable length. Attributes keep source
/// order (scraper's `deterministic` feature).
pub fn snippet(el: ElementRef<'_>) -> String {
    let html = el.html();
    match html.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &html[..cut]),
        None => html,
    }
}

/// Text content of `el` with runs of whitespace collapsed.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive substring test on an attribute value.
pub fn attr_contains(el: ElementRef<'_>, attr: &str, needle: &str) -> bool {
    el.value()
        .attr(attr)
        .is_some_and(|v| v.to_lowercase().contains(needle))
}

/// Whether any ancestor of `el` is a `tag` element.
pub fn has_ancestor(el: ElementRef<'_>, tag: &str) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == tag)
}

/// The parent element, if any.
pub fn parent(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}
