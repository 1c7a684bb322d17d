//! Assembly of canonical page images into one document per chapter.
//!
//! The assembler is deterministic: one page per asset, in input order, each
//! page exactly the size of its image.

mod error;
mod pdf;

pub use error::AssemblyError;
pub use pdf::PdfEncoder;

use tracing::{info, instrument};

use crate::model::CanonicalAsset;

/// File extension of assembled documents.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Builds a paginated document one image at a time.
pub trait DocumentEncoder {
    /// Appends a page showing `jpeg` at `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError`] if the page cannot be represented.
    fn add_page(&mut self, jpeg: &[u8], width: u32, height: u32) -> Result<(), AssemblyError>;

    /// Serializes the document.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::Empty`] when no page was added, or
    /// [`AssemblyError::Encode`] on serialization failure.
    fn save(self) -> Result<Vec<u8>, AssemblyError>;
}

/// Assembles `assets` into a PDF.
///
/// # Errors
///
/// Returns [`AssemblyError::Empty`] for an empty slice, or the encoder's
/// error for a malformed page.
pub fn assemble(assets: &[CanonicalAsset]) -> Result<Vec<u8>, AssemblyError> {
    assemble_with(PdfEncoder::new(), assets)
}

/// Assembles `assets` with a caller-supplied encoder.
///
/// # Errors
///
/// Same as [`assemble`].
#[instrument(skip(encoder, assets), fields(pages = assets.len()))]
pub fn assemble_with<E: DocumentEncoder>(
    mut encoder: E,
    assets: &[CanonicalAsset],
) -> Result<Vec<u8>, AssemblyError> {
    if assets.is_empty() {
        return Err(AssemblyError::Empty);
    }
    for asset in assets {
        encoder.add_page(&asset.data, asset.width, asset.height)?;
    }
    let data = encoder.save()?;
    info!(bytes = data.len(), "document assembled");
    Ok(data)
}
