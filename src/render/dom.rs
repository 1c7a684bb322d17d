//! Owned DOM snapshots produced by page queries.
//!
//! Rendering providers hand back [`ElementNode`] values instead of live
//! handles: a node is a detached copy of one matched element (tag, collapsed
//! text, attributes, outer HTML) that can be moved across tasks and queried
//! again for descendants.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::RenderError;

/// A detached snapshot of one element matched by a selector query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
    html: String,
    base_url: Option<Url>,
}

impl ElementNode {
    fn from_element(element: ElementRef<'_>, base_url: Option<&Url>) -> Self {
        let raw_text: String = element.text().collect();
        Self {
            tag: element.value().name().to_string(),
            text: collapse_whitespace(&raw_text),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            html: element.html(),
            base_url: base_url.cloned(),
        }
    }

    /// Element tag name, lowercase.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Text content with runs of whitespace collapsed to single spaces.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Outer HTML of the element.
    #[must_use]
    pub fn outer_html(&self) -> &str {
        &self.html
    }

    /// Returns a trimmed, non-empty attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Returns an attribute as an absolute URL, resolved against the page URL.
    ///
    /// Behaves like a browser's `a.href`/`img.src` properties: relative values
    /// are joined onto the document URL, absolute values pass through.
    #[must_use]
    pub fn link(&self, name: &str) -> Option<String> {
        let raw = self.attr(name)?;
        if raw.starts_with("data:") || raw.starts_with("javascript:") || raw.starts_with('#') {
            return None;
        }
        match &self.base_url {
            Some(base) => base.join(raw).ok().map(String::from),
            None => Url::parse(raw).ok().map(String::from),
        }
    }

    /// Returns the first attribute in `names` that yields a usable link.
    #[must_use]
    pub fn first_link(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.link(name))
    }

    /// Queries descendants of this element (the element itself may match).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSelector`] if `selector` cannot be parsed.
    pub fn select(&self, selector: &str) -> Result<Vec<ElementNode>, RenderError> {
        let parsed = parse_selector(selector)?;
        let fragment = Html::parse_fragment(&self.html);
        Ok(fragment
            .select(&parsed)
            .map(|element| Self::from_element(element, self.base_url.as_ref()))
            .collect())
    }

    /// Returns the first match of `selector` below this element, if any.
    ///
    /// Invalid selectors are treated as "no match".
    #[must_use]
    pub fn select_first(&self, selector: &str) -> Option<ElementNode> {
        self.select(selector).ok()?.into_iter().next()
    }
}

/// Runs a CSS selector against a full HTML document.
///
/// # Errors
///
/// Returns [`RenderError::InvalidSelector`] if `selector` cannot be parsed.
pub fn select_nodes(
    html: &str,
    selector: &str,
    base_url: Option<&Url>,
) -> Result<Vec<ElementNode>, RenderError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&parsed)
        .map(|element| ElementNode::from_element(element, base_url))
        .collect())
}

fn parse_selector(selector: &str) -> Result<Selector, RenderError> {
    Selector::parse(selector)
        .map_err(|error| RenderError::invalid_selector(selector, error.to_string()))
}

/// Collapses whitespace runs (including newlines) into single spaces.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
