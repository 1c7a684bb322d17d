//! Adapter registry with URL dispatch and capability checks.
//!
//! The [`AdapterRegistry`] holds no site knowledge of its own: it finds the
//! first adapter whose `supports` predicate accepts a URL and forwards the
//! call after checking the adapter's capability set.

use std::fmt;

use tracing::{debug, info, instrument};

use crate::error::ScrapeError;
use crate::model::{AssetReference, ListingItem, SubItem};

use super::{AdapterDescriptor, Capability, ScrapeSession, SiteAdapter};

/// An ordered collection of site adapters.
///
/// Adapters are tried in registration order; the first one claiming a URL
/// wins. Built once at startup and only read afterwards.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Registers an adapter after the ones already present.
    #[tracing::instrument(skip(self, adapter), fields(adapter_name))]
    pub fn register(&mut self, adapter: Box<dyn SiteAdapter>) {
        tracing::Span::current().record("adapter_name", adapter.name());
        debug!(
            name = adapter.name(),
            capabilities = ?adapter.capabilities().to_vec(),
            "Registering site adapter"
        );
        self.adapters.push(adapter);
    }

    /// Returns the number of registered adapters.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Returns true if no adapters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Descriptors of all adapters in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<AdapterDescriptor> {
        self.adapters.iter().map(|a| a.descriptor()).collect()
    }

    /// Finds the adapter for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UnsupportedSite`] if no adapter claims the URL.
    pub fn resolve(&self, url: &str) -> Result<&dyn SiteAdapter, ScrapeError> {
        let adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.supports(url))
            .map(AsRef::as_ref)
            .ok_or_else(|| ScrapeError::unsupported_site(url))?;
        debug!(adapter = adapter.name(), url, "Resolved site adapter");
        Ok(adapter)
    }

    /// Finds the adapter for `url` and checks that it implements `capability`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UnsupportedSite`] or
    /// [`ScrapeError::CapabilityNotSupported`].
    pub fn resolve_capable(
        &self,
        url: &str,
        capability: Capability,
    ) -> Result<&dyn SiteAdapter, ScrapeError> {
        let adapter = self.resolve(url)?;
        if !adapter.capabilities().contains(capability) {
            return Err(ScrapeError::capability_not_supported(
                adapter.name(),
                capability,
            ));
        }
        Ok(adapter)
    }

    /// Lists the series on `site_url` with the adapter that claims it.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UnsupportedSite`],
    /// [`ScrapeError::CapabilityNotSupported`] or the adapter's own error.
    #[instrument(skip(self, session))]
    pub async fn list_top_level(
        &self,
        session: &ScrapeSession<'_>,
        site_url: &str,
    ) -> Result<Vec<ListingItem>, ScrapeError> {
        let adapter = self.resolve_capable(site_url, Capability::ListTopLevel)?;
        let items = adapter.list_top_level(session, site_url).await?;
        info!(adapter = adapter.name(), count = items.len(), "Listed series");
        Ok(items)
    }

    /// Lists the chapters of `series_url`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UnsupportedSite`],
    /// [`ScrapeError::CapabilityNotSupported`] or the adapter's own error.
    #[instrument(skip(self, session))]
    pub async fn list_sub_items(
        &self,
        session: &ScrapeSession<'_>,
        series_url: &str,
    ) -> Result<Vec<SubItem>, ScrapeError> {
        let adapter = self.resolve_capable(series_url, Capability::ListSubItems)?;
        let items = adapter.list_sub_items(session, series_url).await?;
        info!(adapter = adapter.name(), count = items.len(), "Listed chapters");
        Ok(items)
    }

    /// Resolves the page images of `sub_item` using the adapter for `series_url`.
    ///
    /// Dispatch goes by the series URL so chapters hosted on a reader
    /// subdomain still reach the right adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UnsupportedSite`],
    /// [`ScrapeError::CapabilityNotSupported`] or the adapter's own error.
    #[instrument(skip(self, session, sub_item), fields(chapter = %sub_item.title))]
    pub async fn resolve_assets(
        &self,
        session: &ScrapeSession<'_>,
        series_url: &str,
        sub_item: &SubItem,
    ) -> Result<Vec<AssetReference>, ScrapeError> {
        let adapter = self.resolve_capable(series_url, Capability::ResolveAssets)?;
        let assets = adapter.resolve_assets(session, sub_item).await?;
        info!(adapter = adapter.name(), count = assets.len(), "Resolved chapter images");
        Ok(assets)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.adapters.iter().map(|a| a.name()).collect();
        f.debug_struct("AdapterRegistry")
            .field("adapters", &names)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::adapter::Capabilities;
    use crate::navigation::NavigationPolicy;
    use crate::render::{Page, PageOptions, RenderContext, RenderError};

    /// Adapter that only lists chapters.
    struct ChaptersOnly {
        name: &'static str,
        host: &'static str,
    }

    #[async_trait]
    impl SiteAdapter for ChaptersOnly {
        fn name(&self) -> &str {
            self.name
        }

        fn supports(&self, url: &str) -> bool {
            url.contains(self.host)
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::none().with(Capability::ListSubItems)
        }

        async fn list_sub_items(
            &self,
            _session: &ScrapeSession<'_>,
            series_url: &str,
        ) -> Result<Vec<SubItem>, ScrapeError> {
            Ok(vec![SubItem::new(self.name, series_url)])
        }
    }

    struct NoPages;

    #[async_trait]
    impl RenderContext for NoPages {
        async fn new_page(
            &self,
            url: &str,
            _options: PageOptions,
        ) -> Result<Box<dyn Page>, RenderError> {
            Err(RenderError::load(url, "unused"))
        }

        async fn release(&self) {}
    }

    fn registry() -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(ChaptersOnly {
            name: "first",
            host: "a.example",
        }));
        registry.register(Box::new(ChaptersOnly {
            name: "second",
            host: "example",
        }));
        registry
    }

    #[test]
    fn test_resolve_first_registered_match_wins() {
        let registry = registry();
        assert_eq!(registry.resolve("https://a.example/x").unwrap().name(), "first");
        assert_eq!(registry.resolve("https://b.example/x").unwrap().name(), "second");
        assert_eq!(registry.adapter_count(), 2);
    }

    #[test]
    fn test_resolve_unknown_site() {
        let err = registry().resolve("https://other.test/").err().unwrap();
        assert!(matches!(err, ScrapeError::UnsupportedSite { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_checks_capabilities() {
        let registry = registry();
        let navigation = NavigationPolicy::default();
        let session = ScrapeSession::new(&NoPages, &navigation, Duration::from_millis(10));

        let err = registry
            .list_top_level(&session, "https://a.example/")
            .await
            .unwrap_err();
        match err {
            ScrapeError::CapabilityNotSupported {
                adapter,
                capability,
            } => {
                assert_eq!(adapter, "first");
                assert_eq!(capability, Capability::ListTopLevel);
            }
            other => panic!("Expected CapabilityNotSupported, got {other:?}"),
        }

        let chapters = registry
            .list_sub_items(&session, "https://a.example/s")
            .await
            .unwrap();
        assert_eq!(chapters[0].title, "first");
    }

    #[tokio::test]
    async fn test_default_trait_method_reports_missing_capability() {
        let adapter = ChaptersOnly {
            name: "first",
            host: "a.example",
        };
        let navigation = NavigationPolicy::default();
        let session = ScrapeSession::new(&NoPages, &navigation, Duration::from_millis(10));

        let err = adapter
            .resolve_assets(&session, &SubItem::new("Chapter 1", "https://a.example/c1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("resolving chapter images"));
    }

    #[test]
    fn test_descriptors_follow_registration_order() {
        let descriptors = registry().descriptors();
        assert_eq!(descriptors[0].name, "first");
        assert_eq!(descriptors[1].capabilities, vec![Capability::ListSubItems]);
    }
}
