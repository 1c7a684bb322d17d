//! Data types passed between adapters, the asset pipeline and the caller.

use serde::{Deserialize, Serialize};

/// One entry of a site-wide listing (a series).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Display title.
    pub title: String,
    /// Series page URL.
    pub url: String,
    /// Cover image URL, when the listing shows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// One chapter (or episode) of a series.
///
/// The `title` is a display label assigned by the adapter; `url` is the only
/// stable identity of a sub-item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubItem {
    /// Display title, e.g. "Chapter 12".
    pub title: String,
    /// Chapter reader URL.
    pub url: String,
    /// Site-provided chapter number, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_hint: Option<String>,
    /// Site-provided release date text, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl SubItem {
    /// Creates a sub-item with no sequence hint or date.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            sequence_hint: None,
            published_at: None,
        }
    }
}

/// A resolved direct URL to one page image of a sub-item.
///
/// `index` is the page position within the sub-item and is carried through
/// concurrent download so results can be put back in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Zero-based page position.
    pub index: usize,
    /// Direct image URL.
    pub url: String,
}

impl AssetReference {
    /// Builds references from URLs, numbering them in the given order.
    #[must_use]
    pub fn from_urls<I, S>(urls: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| Self {
                index,
                url: url.into(),
            })
            .collect()
    }
}

/// A page image in the canonical raster format (baseline RGB JPEG).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAsset {
    /// Encoded JPEG bytes.
    pub data: Vec<u8>,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

/// One assembled document for one sub-item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentArtifact {
    /// The sub-item's display title.
    pub display_title: String,
    /// Filesystem-safe file name including extension.
    pub file_name: String,
    /// Encoded document bytes.
    pub data: Vec<u8>,
    /// Number of pages in the document.
    pub page_count: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_references_numbered_in_order() {
        let refs = AssetReference::from_urls(["https://a/1.jpg", "https://a/2.jpg"]);
        assert_eq!(refs[0].index, 0);
        assert_eq!(refs[1].index, 1);
        assert_eq!(refs[1].url, "https://a/2.jpg");
    }

    #[test]
    fn test_sub_item_json_omits_missing_fields() {
        let item = SubItem::new("Chapter 1", "https://example.com/c1");
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("sequence_hint"));
        let parsed: SubItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn test_sub_item_deserializes_without_optional_fields() {
        let parsed: SubItem =
            serde_json::from_str(r#"{"title":"Chapter 3","url":"https://x/c3"}"#).unwrap();
        assert_eq!(parsed.title, "Chapter 3");
        assert!(parsed.published_at.is_none());
    }
}
