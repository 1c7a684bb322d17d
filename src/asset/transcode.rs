//! Transcoding downloaded images into the canonical page format.
//!
//! Sites serve pages as JPEG, PNG, WebP or GIF. Every page is decoded and
//! re-encoded as a baseline RGB JPEG so the document encoder only has to
//! embed one kind of image.

use std::io::Cursor;

use image::GenericImageView;
use image::codecs::jpeg::JpegEncoder;

use crate::model::CanonicalAsset;

use super::AssetError;

/// Default JPEG quality for canonical pages.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Converts raw image bytes into a [`CanonicalAsset`].
///
/// Implementations run on a blocking thread and must not block on I/O.
pub trait Transcoder: Send + Sync {
    /// Decodes `bytes` (downloaded from `url`) and re-encodes them.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Transcode`] for undecodable or zero-sized images.
    fn to_canonical(&self, url: &str, bytes: &[u8]) -> Result<CanonicalAsset, AssetError>;
}

/// [`Transcoder`] producing baseline RGB JPEG with the `image` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegTranscoder {
    quality: u8,
}

impl JpegTranscoder {
    /// Creates a transcoder; `quality` is clamped to 1..=100.
    #[must_use]
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Configured JPEG quality.
    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegTranscoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl Transcoder for JpegTranscoder {
    fn to_canonical(&self, url: &str, bytes: &[u8]) -> Result<CanonicalAsset, AssetError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| AssetError::transcode(url, e.to_string()))?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(AssetError::transcode(url, "image has zero width or height"));
        }

        let rgb = decoded.to_rgb8();
        let mut data = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut data), self.quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| AssetError::transcode(url, e.to_string()))?;

        Ok(CanonicalAsset {
            data,
            width,
            height,
        })
    }
}
