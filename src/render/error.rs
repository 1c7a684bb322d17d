//! Error types for rendering context operations.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a rendering context provider or one of its pages.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The provider could not produce a rendering context.
    #[error("failed to acquire rendering context: {reason}")]
    Acquire {
        /// Why acquisition failed.
        reason: String,
    },

    /// The page could not be loaded (network failure, browser crash, etc.)
    #[error("failed to load {url}: {reason}")]
    Load {
        /// The URL being loaded.
        url: String,
        /// Why loading failed.
        reason: String,
    },

    /// The server answered the page request with a non-success status.
    #[error("HTTP {status} loading {url}")]
    HttpStatus {
        /// The URL being loaded.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The page did not settle within the navigation timeout.
    #[error("timed out after {}ms loading {url}", timeout.as_millis())]
    Timeout {
        /// The URL being loaded.
        url: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The page body exceeded the provider's size limit.
    #[error("page {url} exceeds the {limit_bytes} byte limit")]
    TooLarge {
        /// The URL being loaded.
        url: String,
        /// The configured limit.
        limit_bytes: u64,
    },

    /// A CSS selector could not be parsed.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// Parser message.
        reason: String,
    },

    /// A DOM query against a loaded page failed.
    #[error("query '{selector}' failed on {url}: {reason}")]
    Query {
        /// The page URL.
        url: String,
        /// The selector being evaluated.
        selector: String,
        /// Why the query failed.
        reason: String,
    },
}

impl RenderError {
    /// Creates an acquisition error.
    pub fn acquire(reason: impl Into<String>) -> Self {
        Self::Acquire {
            reason: reason.into(),
        }
    }

    /// Creates a load error.
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout,
        }
    }

    /// Creates an oversized page error.
    pub fn too_large(url: impl Into<String>, limit_bytes: u64) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit_bytes,
        }
    }

    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Creates a query error.
    pub fn query(
        url: impl Into<String>,
        selector: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Query {
            url: url.into(),
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_timeout_display() {
        let err = RenderError::timeout("https://example.com/a", Duration::from_secs(60));
        let msg = err.to_string();
        assert!(msg.contains("60000ms"), "Expected timeout in: {msg}");
        assert!(msg.contains("https://example.com/a"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_render_error_http_status_display() {
        let err = RenderError::http_status("https://example.com/a", 503);
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_render_error_invalid_selector_display() {
        let err = RenderError::invalid_selector("div[", "unexpected end");
        let msg = err.to_string();
        assert!(msg.contains("div["));
        assert!(msg.contains("unexpected end"));
    }
}
