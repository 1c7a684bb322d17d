//! Site adapters: per-site knowledge of where listings, chapters and page
//! images live in the markup.
//!
//! # Architecture
//!
//! - [`SiteAdapter`] - Async trait that individual site adapters implement
//! - [`AdapterRegistry`] - Ordered collection of adapters; maps a URL to the
//!   adapter claiming it and checks capabilities at dispatch time
//! - [`ScrapeSession`] - Rendering context plus navigation policy handed to
//!   every adapter call
//! - [`ManhuafastAdapter`] - Madara-theme site (`manhuafast.net`)
//! - [`ManhuagaAdapter`] - MangaReader-theme site (`manhuaga.com`)
//!
//! # Example
//!
//! ```no_run
//! use mangadl_core::adapter::{ScrapeSession, build_default_adapter_registry};
//! use mangadl_core::navigation::NavigationPolicy;
//! use mangadl_core::render::{HttpRenderProvider, RenderProvider};
//! use mangadl_core::selector::DEFAULT_SELECTOR_WAIT;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_adapter_registry();
//! let provider = HttpRenderProvider::new("Mozilla/5.0")?;
//! let ctx = provider.acquire().await?;
//! let navigation = NavigationPolicy::default();
//! let session = ScrapeSession::new(ctx.as_ref(), &navigation, DEFAULT_SELECTOR_WAIT);
//!
//! let chapters = registry
//!     .list_sub_items(&session, "https://manhuaga.com/manga/some-series/")
//!     .await;
//! ctx.release().await;
//! println!("{} chapters", chapters?.len());
//! # Ok(())
//! # }
//! ```

mod manhuafast;
mod manhuaga;
mod registry;
mod utils;

pub use manhuafast::ManhuafastAdapter;
pub use manhuaga::ManhuagaAdapter;
pub use registry::AdapterRegistry;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ScrapeError;
use crate::model::{AssetReference, ListingItem, SubItem};
use crate::navigation::NavigationPolicy;
use crate::render::{Page, RenderContext};
use crate::selector::SelectorChain;

/// Builds the registry used by the CLI and the [`MangaScraper`](crate::MangaScraper) facade.
///
/// Registration order decides which adapter wins when several claim a URL.
#[must_use]
pub fn build_default_adapter_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Box::new(ManhuafastAdapter::new()));
    registry.register(Box::new(ManhuagaAdapter::new()));
    registry
}

/// One operation an adapter may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// List the series shown on a site page.
    ListTopLevel,
    /// List the chapters of a series.
    ListSubItems,
    /// Resolve the page image URLs of a chapter.
    ResolveAssets,
}

impl Capability {
    /// All capabilities in pipeline order.
    pub const ALL: [Capability; 3] = [
        Capability::ListTopLevel,
        Capability::ListSubItems,
        Capability::ResolveAssets,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ListTopLevel => "listing series",
            Self::ListSubItems => "listing chapters",
            Self::ResolveAssets => "resolving chapter images",
        };
        f.write_str(label)
    }
}

/// The set of operations an adapter implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    list_top_level: bool,
    list_sub_items: bool,
    resolve_assets: bool,
}

impl Capabilities {
    /// Every capability.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            list_top_level: true,
            list_sub_items: true,
            resolve_assets: true,
        }
    }

    /// No capabilities.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            list_top_level: false,
            list_sub_items: false,
            resolve_assets: false,
        }
    }

    /// Adds `capability` to the set.
    #[must_use]
    pub const fn with(mut self, capability: Capability) -> Self {
        match capability {
            Capability::ListTopLevel => self.list_top_level = true,
            Capability::ListSubItems => self.list_sub_items = true,
            Capability::ResolveAssets => self.resolve_assets = true,
        }
        self
    }

    /// Returns true if `capability` is in the set.
    #[must_use]
    pub const fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::ListTopLevel => self.list_top_level,
            Capability::ListSubItems => self.list_sub_items,
            Capability::ResolveAssets => self.resolve_assets,
        }
    }

    /// Capabilities in the set, in pipeline order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.contains(*capability))
            .collect()
    }
}

/// Read-only description of a registered adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterDescriptor {
    /// Adapter name (the site's host).
    pub name: String,
    /// Operations the adapter implements.
    pub capabilities: Vec<Capability>,
}

/// Everything an adapter needs to load and query pages during one operation.
///
/// Borrowed from the caller that acquired the rendering context; adapters
/// never acquire or release contexts themselves.
#[derive(Clone, Copy)]
pub struct ScrapeSession<'a> {
    render: &'a dyn RenderContext,
    navigation: &'a NavigationPolicy,
    selector_wait: Duration,
}

impl<'a> ScrapeSession<'a> {
    /// Creates a session over an acquired rendering context.
    #[must_use]
    pub fn new(
        render: &'a dyn RenderContext,
        navigation: &'a NavigationPolicy,
        selector_wait: Duration,
    ) -> Self {
        Self {
            render,
            navigation,
            selector_wait,
        }
    }

    /// Loads `url` through the navigation policy.
    ///
    /// The caller must [`close`](Page::close) the returned page.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Navigation`] once the retry ceiling is reached.
    pub async fn open(&self, url: &str) -> Result<Box<dyn Page>, ScrapeError> {
        self.navigation.load_page(self.render, url).await
    }

    /// Applies this session's per-strategy wait to `chain`.
    #[must_use]
    pub fn chain<T>(&self, chain: SelectorChain<T>) -> SelectorChain<T> {
        chain.with_wait(self.selector_wait)
    }
}

impl fmt::Debug for ScrapeSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeSession")
            .field("navigation", self.navigation)
            .field("selector_wait", &self.selector_wait)
            .finish_non_exhaustive()
    }
}

/// A site-specific scraper.
///
/// Operations an adapter does not implement keep the default body, which
/// fails with [`ScrapeError::CapabilityNotSupported`]; [`capabilities`]
/// must agree with what is overridden.
///
/// Chapter lists are returned oldest first. How display titles are numbered
/// is up to each adapter.
///
/// # Object Safety
///
/// Uses `async_trait` so adapters can be stored as `Box<dyn SiteAdapter>`.
///
/// [`capabilities`]: SiteAdapter::capabilities
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Adapter name, usually the site's host.
    fn name(&self) -> &str;

    /// Returns true if this adapter handles `url`.
    fn supports(&self, url: &str) -> bool;

    /// Operations this adapter implements.
    fn capabilities(&self) -> Capabilities;

    /// Lists the series shown on `site_url`.
    ///
    /// # Errors
    ///
    /// Navigation failures; an empty page yields `Ok(vec![])`.
    async fn list_top_level(
        &self,
        _session: &ScrapeSession<'_>,
        _site_url: &str,
    ) -> Result<Vec<ListingItem>, ScrapeError> {
        Err(ScrapeError::capability_not_supported(
            self.name(),
            Capability::ListTopLevel,
        ))
    }

    /// Lists the chapters of `series_url`, oldest first.
    ///
    /// # Errors
    ///
    /// Navigation failures; an empty page yields `Ok(vec![])`.
    async fn list_sub_items(
        &self,
        _session: &ScrapeSession<'_>,
        _series_url: &str,
    ) -> Result<Vec<SubItem>, ScrapeError> {
        Err(ScrapeError::capability_not_supported(
            self.name(),
            Capability::ListSubItems,
        ))
    }

    /// Resolves the page image URLs of `sub_item`, in reading order.
    ///
    /// # Errors
    ///
    /// Navigation failures, and [`ScrapeError::SelectorExhausted`] when no
    /// image can be found.
    async fn resolve_assets(
        &self,
        _session: &ScrapeSession<'_>,
        _sub_item: &SubItem,
    ) -> Result<Vec<AssetReference>, ScrapeError> {
        Err(ScrapeError::capability_not_supported(
            self.name(),
            Capability::ResolveAssets,
        ))
    }

    /// Extra request headers for downloading `sub_item`'s images.
    ///
    /// Image hosts commonly reject hotlinked requests, so the default sends
    /// the chapter page as `Referer`.
    fn asset_headers(&self, sub_item: &SubItem) -> Vec<(String, String)> {
        vec![("Referer".to_string(), sub_item.url.clone())]
    }

    /// Describes this adapter for listings.
    fn descriptor(&self) -> AdapterDescriptor {
        AdapterDescriptor {
            name: self.name().to_string(),
            capabilities: self.capabilities().to_vec(),
        }
    }
}
