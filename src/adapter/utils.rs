//! Shared helpers for site adapters: host matching, chapter numbering and
//! common extractors.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::render::ElementNode;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// "Chapter 12", "Ch. 12.5", "chapter-12-5" and similar.
static CHAPTER_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)\bch(?:apter)?\.?[\s_-]*(\d+(?:[.-]\d+)?)")
});

/// Lazy-load attributes checked before `src`.
pub const IMAGE_SOURCE_ATTRS: [&str; 3] = ["data-src", "data-lazy-src", "src"];

/// Normalizes a host string: trim, strip leading "www.", trailing '.', and lowercases.
#[must_use]
pub fn canonical_host(host: &str) -> String {
    host.trim()
        .trim_start_matches("www.")
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Host (and optionally port) an adapter claims.
///
/// Subdomains of the host match too; `www.` is ignored on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteHost {
    host: String,
    port: Option<u16>,
}

impl SiteHost {
    /// Matches `host` on any port.
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: canonical_host(host),
            port: None,
        }
    }

    /// Matches the host and effective port of `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `base_url` is not an absolute URL with a host.
    pub fn from_base_url(base_url: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(base_url)?;
        let host = parsed.host_str().ok_or(url::ParseError::EmptyHost)?;
        Ok(Self {
            host: canonical_host(host),
            port: parsed.port_or_known_default(),
        })
    }

    /// Returns true if `url` is served by this site.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str().map(canonical_host) else {
            return false;
        };
        let host_ok = host == self.host || host.ends_with(&format!(".{}", self.host));
        let port_ok = self
            .port
            .is_none_or(|port| parsed.port_or_known_default() == Some(port));
        host_ok && port_ok
    }
}

/// Extracts a chapter number from a title or URL ("12", "12.5").
#[must_use]
pub fn chapter_number(value: &str) -> Option<String> {
    CHAPTER_NUMBER_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('-', "."))
}

/// Drops records whose key was already seen, keeping the first occurrence.
pub fn dedup_by_key<T, F>(records: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(key(record)))
        .collect()
}

/// Anchor URL of a node: its own `href`, or that of its first descendant anchor.
#[must_use]
pub fn anchor_link(node: &ElementNode) -> Option<String> {
    node.link("href")
        .or_else(|| node.select_first("a[href]").and_then(|a| a.link("href")))
}

/// First usable image URL of an `img` node, honoring lazy-load attributes.
#[must_use]
pub fn image_source(node: &ElementNode) -> Option<String> {
    node.first_link(&IMAGE_SOURCE_ATTRS)
}

/// Returns true if the URL path ends in a page image extension.
#[must_use]
pub fn has_image_extension(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_default();
    [".jpg", ".jpeg", ".png", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
}
