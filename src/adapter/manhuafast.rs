//! Adapter for `manhuafast.net`, a WordPress site on the Madara manga theme.
//!
//! Every operation runs a chain of theme selectors first and falls back to
//! generic link/image scans when the theme markup is not found.

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::error::ScrapeError;
use crate::model::{AssetReference, ListingItem, SubItem};
use crate::render::{ElementNode, Page};
use crate::selector::SelectorChain;

use super::utils::{
    SiteHost, anchor_link, chapter_number, dedup_by_key, has_image_extension, image_source,
};
use super::{Capabilities, ScrapeSession, SiteAdapter};

const ADAPTER_NAME: &str = "manhuafast.net";
const DEFAULT_HOST: &str = "manhuafast.net";
const ARCHIVE_PATH: &str = "/manga/";

/// Images narrower than this are icons and banners, not pages.
const MIN_FALLBACK_IMAGE_WIDTH: u32 = 100;

/// One chapter row as found on the series page (newest first).
#[derive(Debug, Clone)]
struct ChapterRow {
    title: String,
    url: String,
    date: Option<String>,
}

/// Madara-theme adapter for `manhuafast.net`.
#[derive(Debug, Clone)]
pub struct ManhuafastAdapter {
    site: SiteHost,
}

impl ManhuafastAdapter {
    /// Creates an adapter claiming `manhuafast.net` URLs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            site: SiteHost::new(DEFAULT_HOST),
        }
    }

    /// Creates an adapter claiming the host and port of `base_url` (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `base_url` has no host.
    pub fn with_base_url(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            site: SiteHost::from_base_url(base_url)?,
        })
    }

    fn listing_chain() -> SelectorChain<ListingItem> {
        SelectorChain::new("series")
            .strategy("div.page-item-detail.manga", |nodes: &[ElementNode]| {
                listing_from_cards(nodes, ".item-summary .post-title h3 a")
            })
            .strategy(".c-tabs-item__content", |nodes: &[ElementNode]| {
                listing_from_cards(nodes, ".post-title h3 a")
            })
            .strategy(".c-tabs-item", |nodes: &[ElementNode]| {
                listing_from_cards(nodes, ".row .col-12 h3 a")
            })
    }

    fn archive_chain() -> SelectorChain<ListingItem> {
        SelectorChain::new("series links").strategy(
            r#"a[href*="/manga/"]"#,
            |nodes: &[ElementNode]| {
                let items = nodes
                    .iter()
                    .filter(|a| !a.text().is_empty())
                    .filter_map(|a| {
                        let url = a.link("href")?;
                        let path = Url::parse(&url).ok()?.path().to_string();
                        if path.contains("/chapter/") || path.trim_end_matches('/') == "/manga" {
                            return None;
                        }
                        Some(ListingItem {
                            title: a.text().to_string(),
                            url,
                            cover_url: None,
                        })
                    })
                    .collect();
                dedup_by_key(items, |item: &ListingItem| item.url.clone())
            },
        )
    }

    fn chapter_chain() -> SelectorChain<ChapterRow> {
        SelectorChain::new("chapters")
            .strategy("li.wp-manga-chapter", chapter_rows)
            .strategy(".wp-manga-chapter", chapter_rows)
            .strategy(".chapter-link", chapter_rows)
            .strategy(".chapter", chapter_rows)
    }

    fn generic_chapter_chain() -> SelectorChain<ChapterRow> {
        SelectorChain::new("chapter links").strategy(
            r#"a[href*="/chapter/"]"#,
            |nodes: &[ElementNode]| {
                let rows = nodes
                    .iter()
                    .filter_map(|a| {
                        Some(ChapterRow {
                            title: a.text().to_string(),
                            url: a.link("href")?,
                            date: None,
                        })
                    })
                    .collect();
                dedup_by_key(rows, |row: &ChapterRow| row.url.clone())
            },
        )
    }

    fn image_chain() -> SelectorChain<String> {
        let sources = |nodes: &[ElementNode]| -> Vec<String> {
            nodes.iter().filter_map(image_source).collect()
        };
        SelectorChain::new("chapter images")
            .strategy("div.page-break.no-gaps img", sources)
            .strategy(".reading-content img", sources)
            .strategy(".entry-content img", sources)
            .strategy(".wp-manga-chapter-img", sources)
            .strategy("img", |nodes: &[ElementNode]| {
                nodes
                    .iter()
                    .filter(|img| {
                        img.attr("width")
                            .and_then(|w| w.trim_end_matches("px").parse::<u32>().ok())
                            .is_some_and(|w| w > MIN_FALLBACK_IMAGE_WIDTH)
                    })
                    .filter_map(image_source)
                    .filter(|src| has_image_extension(src))
                    .collect()
            })
    }

    async fn scan_listing(
        session: &ScrapeSession<'_>,
        page: &dyn Page,
    ) -> Result<Vec<ListingItem>, ScrapeError> {
        let items = session.chain(Self::listing_chain()).resolve(page).await;
        if !items.is_empty() {
            return Ok(items);
        }

        let Some(archive_url) = Url::parse(page.url())
            .ok()
            .and_then(|url| url.join(ARCHIVE_PATH).ok())
        else {
            return Ok(Vec::new());
        };
        warn!(
            archive = %archive_url,
            "theme listing selectors failed, falling back to archive links"
        );

        let archive = session.open(archive_url.as_str()).await?;
        let items = session.chain(Self::archive_chain()).resolve(archive.as_ref()).await;
        archive.close().await;
        Ok(items)
    }
}

impl Default for ManhuafastAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Series cards: title anchor found under `title_selector`, cover from the first image.
fn listing_from_cards(cards: &[ElementNode], title_selector: &str) -> Vec<ListingItem> {
    cards
        .iter()
        .filter_map(|card| {
            let anchor = card.select_first(title_selector)?;
            let title = anchor.text().to_string();
            if title.is_empty() {
                return None;
            }
            Some(ListingItem {
                title,
                url: anchor.link("href")?,
                cover_url: card.select_first("img").and_then(|img| image_source(&img)),
            })
        })
        .collect()
}

/// Chapter rows from `li`-like containers or bare anchors.
fn chapter_rows(nodes: &[ElementNode]) -> Vec<ChapterRow> {
    nodes
        .iter()
        .filter_map(|node| {
            let url = anchor_link(node)?;
            let title = if node.tag() == "a" {
                node.text().to_string()
            } else {
                node.select_first("a")
                    .map(|a| a.text().to_string())
                    .unwrap_or_default()
            };
            let date = node
                .select_first(".chapter-release-date")
                .map(|d| d.text().to_string())
                .filter(|d| !d.is_empty());
            Some(ChapterRow { title, url, date })
        })
        .collect()
}

/// Oldest-first sub-items; keeps "Chapter ..." titles unless `renumber_all`.
fn number_chapters(rows: Vec<ChapterRow>, renumber_all: bool) -> Vec<SubItem> {
    dedup_by_key(rows, |row| row.url.clone())
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, row)| {
            let sequence_hint = chapter_number(&row.title).or_else(|| chapter_number(&row.url));
            let title = if !renumber_all && row.title.contains("Chapter") {
                row.title
            } else {
                format!("Chapter {}", i + 1)
            };
            SubItem {
                title,
                url: row.url,
                sequence_hint,
                published_at: row.date,
            }
        })
        .collect()
}

#[async_trait]
impl SiteAdapter for ManhuafastAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn supports(&self, url: &str) -> bool {
        self.site.matches(url)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn list_top_level(
        &self,
        session: &ScrapeSession<'_>,
        site_url: &str,
    ) -> Result<Vec<ListingItem>, ScrapeError> {
        let page = session.open(site_url).await?;
        let result = Self::scan_listing(session, page.as_ref()).await;
        page.close().await;
        result
    }

    async fn list_sub_items(
        &self,
        session: &ScrapeSession<'_>,
        series_url: &str,
    ) -> Result<Vec<SubItem>, ScrapeError> {
        let page = session.open(series_url).await?;

        let rows = session.chain(Self::chapter_chain()).resolve(page.as_ref()).await;
        let chapters = if rows.is_empty() {
            warn!(url = series_url, "theme chapter selectors failed, falling back to chapter links");
            let rows = session
                .chain(Self::generic_chapter_chain())
                .resolve(page.as_ref())
                .await;
            number_chapters(rows, true)
        } else {
            number_chapters(rows, false)
        };
        page.close().await;

        debug!(count = chapters.len(), "chapters numbered oldest first");
        Ok(chapters)
    }

    async fn resolve_assets(
        &self,
        session: &ScrapeSession<'_>,
        sub_item: &SubItem,
    ) -> Result<Vec<AssetReference>, ScrapeError> {
        let page = session.open(&sub_item.url).await?;
        let urls = session
            .chain(Self::image_chain())
            .resolve_required(page.as_ref())
            .await;
        page.close().await;
        Ok(AssetReference::from_urls(urls?))
    }
}
