//! Mangadl Core Library
//!
//! Scrapes series and chapter listings from manga reader sites and turns
//! chapters into PDF documents, one page per chapter image.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`render`] - Rendering context abstraction (static HTTP, optional Chrome)
//! - [`selector`] - Ordered selector fallback chains over a loaded page
//! - [`navigation`] - Page loads with bounded retry and timeout
//! - [`adapter`] - Site adapters and the URL-dispatching registry
//! - [`asset`] - Concurrent image download and JPEG transcoding
//! - [`document`] - PDF assembly
//! - [`batch`] - Chapter-by-chapter orchestration with failure isolation
//! - [`service`] - The [`MangaScraper`] facade tying everything together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod asset;
pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod navigation;
pub mod render;
pub mod retry;
pub mod selector;
pub mod service;
pub mod user_agent;

// Re-export commonly used types
pub use adapter::{
    AdapterDescriptor, AdapterRegistry, Capabilities, Capability, ScrapeSession, SiteAdapter,
    build_default_adapter_registry,
};
pub use asset::{AssetError, AssetPipeline, AssetReport, FailureType, classify_error};
pub use batch::{BatchEvent, BatchOrchestrator, BatchReport, sanitize_file_name};
pub use config::{ConfigError, ScraperConfig};
pub use document::{AssemblyError, assemble};
pub use error::ScrapeError;
pub use model::{AssetReference, CanonicalAsset, DocumentArtifact, ListingItem, SubItem};
pub use navigation::NavigationPolicy;
pub use render::{RenderError, RenderProvider};
pub use retry::{Backoff, RetryPolicy, with_retry};
pub use service::MangaScraper;
