//! Page image download and transcoding.
//!
//! Images are fetched directly over HTTP (never through a page view),
//! decoded, and re-encoded into the canonical page format (baseline RGB
//! JPEG). The [`AssetPipeline`] runs this for every page of a chapter with
//! bounded concurrency and keeps the pages in their original order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mangadl_core::asset::{AssetPipeline, HttpAssetFetcher, JpegTranscoder};
//! use mangadl_core::model::AssetReference;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpAssetFetcher::new("Mozilla/5.0")?);
//! let pipeline = AssetPipeline::new(fetcher, Arc::new(JpegTranscoder::default()), 6)?;
//! let refs = AssetReference::from_urls(["https://cdn.example.com/1.webp"]);
//! let report = pipeline.fetch_and_transcode(&refs, &[]).await;
//! println!("{} of {} pages", report.assets.len(), report.requested);
//! # Ok(())
//! # }
//! ```

mod error;
mod fetch;
mod pipeline;
mod transcode;

pub use error::{AssetError, FailureType, classify_error};
pub use fetch::{
    AssetFetcher, DEFAULT_ASSET_TIMEOUT, DEFAULT_MAX_ASSET_BYTES, FetchOptions, HttpAssetFetcher,
};
pub use pipeline::{ASSET_RETRY_DELAY, AssetFailure, AssetPipeline, AssetReport};
pub use transcode::{DEFAULT_JPEG_QUALITY, JpegTranscoder, Transcoder};
