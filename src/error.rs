//! Error taxonomy for top-level scraping operations.
//!
//! Per-asset failures ([`AssetError`](crate::asset::AssetError)) never reach
//! this type: the asset pipeline records and skips them. Everything here is a
//! failure of a whole operation or of a whole sub-item.

use thiserror::Error;

use crate::adapter::Capability;
use crate::document::AssemblyError;
use crate::render::RenderError;

/// Errors returned by adapters, the registry and the batch orchestrator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No registered adapter claims the URL.
    #[error("no site adapter supports '{url}'\n  Suggestion: {suggestion}")]
    UnsupportedSite {
        /// The URL that no adapter matched.
        url: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// The adapter exists but does not implement the requested operation.
    #[error("site adapter '{adapter}' does not support {capability}")]
    CapabilityNotSupported {
        /// Adapter name.
        adapter: String,
        /// The missing operation.
        capability: Capability,
    },

    /// A page could not be loaded within the navigation retry ceiling.
    #[error("navigation to '{url}' failed after {attempts} attempt(s): {source}")]
    Navigation {
        /// The page URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Cause of the last failed attempt.
        #[source]
        source: RenderError,
    },

    /// Every extraction strategy came back empty.
    #[error(
        "no {what} found on '{url}': all selector strategies came back empty\n  Suggestion: The site layout may have changed; check the page in a browser"
    )]
    SelectorExhausted {
        /// What was being extracted ("chapter images", ...).
        what: String,
        /// The page URL.
        url: String,
    },

    /// The rendering provider failed outside of navigation.
    #[error("rendering error: {0}")]
    Render(#[from] RenderError),

    /// A sub-item produced no usable page images.
    #[error("'{title}' produced no pages: all {attempted} image(s) failed")]
    NoAssets {
        /// Sub-item display title.
        title: String,
        /// Number of asset references that were attempted.
        attempted: usize,
    },

    /// The document for a sub-item could not be encoded.
    #[error("failed to assemble '{title}': {source}")]
    Assembly {
        /// Sub-item display title.
        title: String,
        /// Encoder failure.
        #[source]
        source: AssemblyError,
    },
}

impl ScrapeError {
    /// Creates an `UnsupportedSite` error.
    #[must_use]
    pub fn unsupported_site(url: &str) -> Self {
        Self::UnsupportedSite {
            url: url.to_string(),
            suggestion: "Run `mangadl sites` to see supported sites".to_string(),
        }
    }

    /// Creates a `CapabilityNotSupported` error.
    #[must_use]
    pub fn capability_not_supported(adapter: &str, capability: Capability) -> Self {
        Self::CapabilityNotSupported {
            adapter: adapter.to_string(),
            capability,
        }
    }

    /// Creates a `Navigation` error.
    #[must_use]
    pub fn navigation(url: &str, attempts: u32, source: RenderError) -> Self {
        Self::Navigation {
            url: url.to_string(),
            attempts,
            source,
        }
    }

    /// Creates a `SelectorExhausted` error.
    #[must_use]
    pub fn selector_exhausted(what: &str, url: &str) -> Self {
        Self::SelectorExhausted {
            what: what.to_string(),
            url: url.to_string(),
        }
    }

    /// Creates a `NoAssets` error.
    #[must_use]
    pub fn no_assets(title: &str, attempted: usize) -> Self {
        Self::NoAssets {
            title: title.to_string(),
            attempted,
        }
    }

    /// Creates an `Assembly` error.
    #[must_use]
    pub fn assembly(title: &str, source: AssemblyError) -> Self {
        Self::Assembly {
            title: title.to_string(),
            source,
        }
    }

    /// Short stable label for logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedSite { .. } => "unsupported_site",
            Self::CapabilityNotSupported { .. } => "capability_not_supported",
            Self::Navigation { .. } => "navigation",
            Self::SelectorExhausted { .. } => "selector_exhausted",
            Self::Render(_) => "render",
            Self::NoAssets { .. } => "no_assets",
            Self::Assembly { .. } => "assembly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_site_message() {
        let err = ScrapeError::unsupported_site("https://unknown.example/");
        let msg = err.to_string();
        assert!(msg.contains("https://unknown.example/"));
        assert!(msg.contains("Suggestion"));
        assert_eq!(err.kind(), "unsupported_site");
    }

    #[test]
    fn test_capability_not_supported_names_operation() {
        let err = ScrapeError::capability_not_supported("example", Capability::ListTopLevel);
        let msg = err.to_string();
        assert!(msg.contains("example"));
        assert!(msg.contains("listing series"), "got: {msg}");
    }

    #[test]
    fn test_navigation_error_carries_attempts_and_cause() {
        let err = ScrapeError::navigation(
            "https://example.com/c1",
            3,
            RenderError::http_status("https://example.com/c1", 502),
        );
        let msg = err.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("502"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_selector_exhausted_message() {
        let err = ScrapeError::selector_exhausted("chapter images", "https://example.com/c1");
        assert!(err.to_string().contains("no chapter images found"));
    }
}
