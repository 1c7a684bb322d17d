//! Document assembly errors.

use thiserror::Error;

/// Errors raised while encoding a chapter document.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// No pages were supplied.
    #[error("cannot assemble a document with no pages")]
    Empty,

    /// A page has a dimension the document format cannot represent.
    #[error("page {index} has invalid dimensions {width}x{height}")]
    InvalidPage {
        /// Zero-based page position.
        index: usize,
        /// Pixel width.
        width: u32,
        /// Pixel height.
        height: u32,
    },

    /// The encoder failed to serialize the document.
    #[error("document encoding failed: {reason}")]
    Encode {
        /// Encoder message.
        reason: String,
    },
}

impl AssemblyError {
    /// Creates an `Encode` error.
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }
}
