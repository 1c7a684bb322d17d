//! High-level entry points used by the CLI and library callers.
//!
//! [`MangaScraper`] owns the adapter registry, the rendering provider and
//! the asset pipeline. Every operation acquires its own rendering context and
//! releases it before returning, on success and on failure.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::adapter::{
    AdapterDescriptor, AdapterRegistry, Capability, ScrapeSession, build_default_adapter_registry,
};
use crate::asset::{ASSET_RETRY_DELAY, AssetFetcher, AssetPipeline, HttpAssetFetcher, JpegTranscoder};
use crate::batch::{BatchEvent, BatchOrchestrator, BatchReport};
use crate::config::{ConfigError, ScraperConfig};
use crate::error::ScrapeError;
use crate::model::{ListingItem, SubItem};
use crate::navigation::NavigationPolicy;
use crate::render::{HttpRenderProvider, RenderContext, RenderProvider, WaitCondition};
use crate::retry::RetryPolicy;

/// Facade over the whole scrape-and-assemble pipeline.
///
/// # Example
///
/// ```no_run
/// use mangadl_core::{MangaScraper, ScraperConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scraper = MangaScraper::new(ScraperConfig::default())?;
/// let chapters = scraper
///     .list_sub_items("https://manhuafast.net/manga/some-series/")
///     .await?;
/// let report = scraper
///     .download_selection("https://manhuafast.net/manga/some-series/", &chapters[..1], |_| {})
///     .await?;
/// for artifact in &report.artifacts {
///     std::fs::write(&artifact.file_name, &artifact.data)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct MangaScraper {
    config: ScraperConfig,
    registry: AdapterRegistry,
    provider: Arc<dyn RenderProvider>,
    navigation: NavigationPolicy,
    pipeline: AssetPipeline,
}

impl MangaScraper {
    /// Creates a scraper with the built-in adapters, the HTTP rendering
    /// provider and the HTTP image fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid or an HTTP client
    /// cannot be built.
    pub fn new(config: ScraperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let provider = HttpRenderProvider::new(&config.user_agent)
            .map_err(|e| ConfigError::http_client(e.to_string()))?;
        let fetcher = HttpAssetFetcher::new(&config.user_agent)
            .map_err(|e| ConfigError::http_client(e.to_string()))?;
        Self::with_parts(
            config,
            build_default_adapter_registry(),
            Arc::new(provider),
            Arc::new(fetcher),
        )
    }

    /// Creates a scraper from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid.
    pub fn with_parts(
        config: ScraperConfig,
        registry: AdapterRegistry,
        provider: Arc<dyn RenderProvider>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let navigation = NavigationPolicy::new(
            RetryPolicy::fixed(config.navigation_attempts, config.navigation_delay),
            WaitCondition::default(),
            config.navigation_timeout,
        );
        let pipeline = AssetPipeline::new(
            fetcher,
            Arc::new(JpegTranscoder::new(config.jpeg_quality)),
            config.asset_concurrency,
        )?
        .with_retry_policy(RetryPolicy::fixed(config.asset_attempts, ASSET_RETRY_DELAY))
        .with_timeout(config.asset_timeout)
        .with_max_bytes(config.max_asset_bytes);

        Ok(Self {
            config,
            registry,
            provider,
            navigation,
            pipeline,
        })
    }

    /// Replaces the rendering provider (e.g. with headless Chrome).
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn RenderProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// The adapter registry.
    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Descriptors of every registered site adapter.
    #[must_use]
    pub fn list_sites(&self) -> Vec<AdapterDescriptor> {
        self.registry.descriptors()
    }

    /// Lists the series shown on `site_url`.
    ///
    /// # Errors
    ///
    /// Returns dispatch, context acquisition and navigation errors. A page
    /// with no recognizable series yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_top_level(&self, site_url: &str) -> Result<Vec<ListingItem>, ScrapeError> {
        self.registry
            .resolve_capable(site_url, Capability::ListTopLevel)?;
        let ctx = self.provider.acquire().await?;
        let session = self.session(ctx.as_ref());
        let result = self.registry.list_top_level(&session, site_url).await;
        self.release(ctx).await;
        result
    }

    /// Lists the chapters of `series_url`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns dispatch, context acquisition and navigation errors. A page
    /// with no recognizable chapters yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_sub_items(&self, series_url: &str) -> Result<Vec<SubItem>, ScrapeError> {
        self.registry
            .resolve_capable(series_url, Capability::ListSubItems)?;
        let ctx = self.provider.acquire().await?;
        let session = self.session(ctx.as_ref());
        let result = self.registry.list_sub_items(&session, series_url).await;
        self.release(ctx).await;
        result
    }

    /// Downloads `selected` chapters of `series_url`, one document each.
    ///
    /// # Errors
    ///
    /// Returns dispatch and context acquisition errors. Chapter failures are
    /// reported in the [`BatchReport`].
    #[instrument(skip(self, selected, on_event), fields(chapters = selected.len()))]
    pub async fn download_selection<F>(
        &self,
        series_url: &str,
        selected: &[SubItem],
        on_event: F,
    ) -> Result<BatchReport, ScrapeError>
    where
        F: FnMut(BatchEvent<'_>) + Send,
    {
        self.registry
            .resolve_capable(series_url, Capability::ResolveAssets)?;
        if selected.is_empty() {
            return Ok(BatchReport::default());
        }

        let ctx = self.provider.acquire().await?;
        let session = self.session(ctx.as_ref());
        let orchestrator = BatchOrchestrator::new(&self.registry, &self.pipeline)
            .with_retry_policy(RetryPolicy::fixed(
                self.config.item_attempts,
                self.config.item_cooldown,
            ));
        let result = orchestrator
            .download_selection(&session, series_url, selected, on_event)
            .await;
        self.release(ctx).await;
        result
    }

    fn session<'a>(&'a self, ctx: &'a dyn RenderContext) -> ScrapeSession<'a> {
        ScrapeSession::new(ctx, &self.navigation, self.config.selector_wait)
    }

    async fn release(&self, ctx: Box<dyn RenderContext>) {
        ctx.release().await;
        debug!(provider = self.provider.name(), "rendering context released");
    }
}

impl std::fmt::Debug for MangaScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MangaScraper")
            .field("registry", &self.registry)
            .field("provider", &self.provider.name())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
