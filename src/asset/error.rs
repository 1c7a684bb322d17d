//! Per-asset errors and their retry classification.
//!
//! An [`AssetError`] never fails a chapter on its own: the pipeline logs it,
//! records it in the report and moves on to the next page.

use thiserror::Error;

/// Errors that can occur while downloading or transcoding one page image.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The image URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before the body was received.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The image URL.
        url: String,
    },

    /// HTTP error response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The image URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body exceeded the configured size limit.
    #[error("{url} exceeds the {limit_bytes} byte image size limit")]
    TooLarge {
        /// The image URL.
        url: String,
        /// Configured limit.
        limit_bytes: u64,
    },

    /// A request header could not be built.
    #[error("invalid request header '{name}' for {url}")]
    InvalidHeader {
        /// The image URL.
        url: String,
        /// Header name.
        name: String,
    },

    /// The bytes could not be decoded or re-encoded as JPEG.
    #[error("failed to transcode {url}: {reason}")]
    Transcode {
        /// The image URL.
        url: String,
        /// Decoder/encoder message.
        reason: String,
    },
}

impl AssetError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a size-limit error.
    pub fn too_large(url: impl Into<String>, limit_bytes: u64) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit_bytes,
        }
    }

    /// Creates an invalid-header error.
    pub fn invalid_header(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidHeader {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Creates a transcode error.
    pub fn transcode(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transcode {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Classification of asset failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// May succeed on retry (timeouts, 5xx, dropped connections).
    Transient,
    /// Will not succeed on retry (404, bad bytes, oversized body).
    Permanent,
    /// The server asked us to slow down (HTTP 429).
    RateLimited,
}

impl FailureType {
    /// Returns true if another attempt is worthwhile.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited)
    }
}

/// Classifies an asset error for the per-asset retry loop.
#[must_use]
pub fn classify_error(error: &AssetError) -> FailureType {
    match error {
        AssetError::HttpStatus { status, .. } => classify_http_status(*status),
        AssetError::Timeout { .. } => FailureType::Transient,
        AssetError::Network { source, .. } => {
            if source.is_builder() || source.is_redirect() {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        AssetError::TooLarge { .. }
        | AssetError::InvalidHeader { .. }
        | AssetError::Transcode { .. } => FailureType::Permanent,
    }
}

/// Maps an HTTP status to its retry class.
#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient, // Request Timeout
        425 => FailureType::Transient, // Too Early
        429 => FailureType::RateLimited,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert_eq!(
            classify_error(&AssetError::http_status("u", 404)),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&AssetError::http_status("u", 403)),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&AssetError::http_status("u", 503)),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&AssetError::http_status("u", 429)),
            FailureType::RateLimited
        );
    }

    #[test]
    fn test_timeout_is_retryable_transcode_is_not() {
        assert!(classify_error(&AssetError::timeout("u")).is_retryable());
        assert!(!classify_error(&AssetError::transcode("u", "bad magic")).is_retryable());
        assert!(!classify_error(&AssetError::too_large("u", 10)).is_retryable());
    }

    #[test]
    fn test_error_messages_name_the_url() {
        let msg = AssetError::http_status("https://cdn.test/2.jpg", 404).to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("https://cdn.test/2.jpg"));
        assert!(
            AssetError::too_large("u", 1024)
                .to_string()
                .contains("1024 byte")
        );
    }
}
