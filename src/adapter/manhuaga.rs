//! Adapter for `manhuaga.com`, a site on the MangaReader theme.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::ScrapeError;
use crate::model::{AssetReference, ListingItem, SubItem};
use crate::render::ElementNode;
use crate::selector::SelectorChain;

use super::utils::{SiteHost, chapter_number, compile_static_regex, dedup_by_key, image_source};
use super::{Capabilities, ScrapeSession, SiteAdapter};

const ADAPTER_NAME: &str = "manhuaga.com";
const DEFAULT_HOST: &str = "manhuaga.com";

/// The reader page embeds its image list as `ts_reader.run({...});`.
static TS_READER_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)ts_reader\.run\((\{.*?\})\)\s*;"));

#[derive(Debug, Deserialize)]
struct TsReaderConfig {
    #[serde(default)]
    sources: Vec<TsReaderSource>,
}

#[derive(Debug, Deserialize)]
struct TsReaderSource {
    #[serde(default)]
    images: Vec<String>,
}

/// MangaReader-theme adapter for `manhuaga.com`.
#[derive(Debug, Clone)]
pub struct ManhuagaAdapter {
    site: SiteHost,
}

impl ManhuagaAdapter {
    /// Creates an adapter claiming `manhuaga.com` URLs.
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
            .strategy(".bsx .bigor .tt a", |nodes: &[ElementNode]| {
                nodes
                    .iter()
                    .filter(|a| !a.text().is_empty())
                    .filter_map(|a| {
                        Some(ListingItem {
                            title: a.text().to_string(),
                            url: a.link("href")?,
                            cover_url: None,
                        })
                    })
                    .collect()
            })
            .strategy(".bsx", |cards: &[ElementNode]| {
                let items = cards
                    .iter()
                    .filter_map(|card| {
                        let anchor = card.select_first("a[href]")?;
                        let title = card
                            .select_first(".tt")
                            .map(|tt| tt.text().to_string())
                            .filter(|t| !t.is_empty())
                            .or_else(|| anchor.attr("title").map(str::to_string))?;
                        Some(ListingItem {
                            title,
                            url: anchor.link("href")?,
                            cover_url: card.select_first("img").and_then(|img| image_source(&img)),
                        })
                    })
                    .collect();
                dedup_by_key(items, |item: &ListingItem| item.url.clone())
            })
    }

    fn chapter_chain() -> SelectorChain<SubItem> {
        SelectorChain::new("chapters")
            .strategy("#chapterlist li", chapter_rows)
            .strategy(".eplister li", chapter_rows)
    }

    fn image_chain() -> SelectorChain<String> {
        let sources = |nodes: &[ElementNode]| -> Vec<String> {
            nodes.iter().filter_map(image_source).collect()
        };
        SelectorChain::new("chapter images")
            .strategy("#readerarea img.ts-main-image", sources)
            .strategy("#readerarea img", sources)
            .strategy("script", |scripts: &[ElementNode]| {
                scripts
                    .iter()
                    .find_map(|script| reader_script_images(script.text()))
                    .unwrap_or_default()
            })
    }
}

impl Default for ManhuagaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Chapter rows as listed on the page (newest first); titles are overlaid later.
fn chapter_rows(rows: &[ElementNode]) -> Vec<SubItem> {
    rows.iter()
        .filter_map(|li| {
            let anchor = li.select_first("a[href]")?;
            let label = li
                .select_first(".chapternum")
                .map_or_else(|| anchor.text().to_string(), |n| n.text().to_string());
            let sequence_hint = li
                .attr("data-num")
                .map(str::to_string)
                .or_else(|| chapter_number(&label));
            Some(SubItem {
                title: label,
                url: anchor.link("href")?,
                sequence_hint,
                published_at: li
                    .select_first(".chapterdate")
                    .map(|d| d.text().to_string())
                    .filter(|d| !d.is_empty()),
            })
        })
        .collect()
}

/// Image URLs from a `ts_reader.run(...)` call in a script body.
fn reader_script_images(script: &str) -> Option<Vec<String>> {
    let json = TS_READER_RE.captures(script)?.get(1)?.as_str();
    let config: TsReaderConfig = serde_json::from_str(json)
        .map_err(|error| debug!(error = %error, "ts_reader config is not valid JSON"))
        .ok()?;
    config
        .sources
        .into_iter()
        .map(|source| source.images)
        .find(|images| !images.is_empty())
}

/// Oldest-first chapters titled "Chapter 1", "Chapter 2", ...
fn number_chapters(rows: Vec<SubItem>) -> Vec<SubItem> {
    dedup_by_key(rows, |row| row.url.clone())
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, row)| SubItem {
            title: format!("Chapter {}", i + 1),
            ..row
        })
        .collect()
}

#[async_trait]
impl SiteAdapter for ManhuagaAdapter {
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
        let items = session.chain(Self::listing_chain()).resolve(page.as_ref()).await;
        page.close().await;
        Ok(items)
    }

    async fn list_sub_items(
        &self,
        session: &ScrapeSession<'_>,
        series_url: &str,
    ) -> Result<Vec<SubItem>, ScrapeError> {
        let page = session.open(series_url).await?;
        let rows = session.chain(Self::chapter_chain()).resolve(page.as_ref()).await;
        page.close().await;
        Ok(number_chapters(rows))
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::render::StaticPage;

    const SERIES_PAGE: &str = r#"
        <div class="eplister" id="chapterlist"><ul>
          <li data-num="3"><div class="eph-num"><a href="/series-c3/">
            <span class="chapternum">Chapter 3</span>
            <span class="chapterdate">June
              3, 2024</span></a></div></li>
          <li data-num="2"><div class="eph-num"><a href="/series-c2/">
            <span class="chapternum">Chapter 2</span><span class="chapterdate">June 2, 2024</span></a></div></li>
          <li><div class="eph-num"><a href="/series-c1/"><span class="chapternum">Ch. 1</span></a></div></li>
          <li><span>no link</span></li>
        </ul></div>
    "#;

    #[test]
    fn test_supports_manhuaga_urls_only() {
        let adapter = ManhuagaAdapter::new();
        assert!(adapter.supports("https://manhuaga.com/manga/x/"));
        assert!(!adapter.supports("https://manhuafast.net/manga/x/"));
    }

    #[tokio::test]
    async fn test_chapters_reversed_and_renumbered() {
        let page = StaticPage::new("https://manhuaga.com/manga/series/", SERIES_PAGE);

        let rows = ManhuagaAdapter::chapter_chain().resolve(&page).await;
        let chapters = number_chapters(rows);

        let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);
        assert_eq!(chapters[0].url, "https://manhuaga.com/series-c1/");
        assert_eq!(chapters[0].sequence_hint.as_deref(), Some("1"));
        assert_eq!(chapters[2].sequence_hint.as_deref(), Some("3"));
        assert_eq!(chapters[2].published_at.as_deref(), Some("June 3, 2024"));
        assert!(chapters[0].published_at.is_none());
    }

    #[tokio::test]
    async fn test_listing_falls_back_to_cards() {
        let page = StaticPage::new(
            "https://manhuaga.com/",
            r#"
            <div class="bs"><div class="bsx"><a href="/manga/alpha/" title="Alpha">
              <div class="limit"><img src="/covers/alpha.webp"></div>
              <div class="bigor"><div class="tt">Alpha</div></div></a></div></div>
            <div class="bs"><div class="bsx"><a href="/manga/beta/" title="Beta Title">
              <div class="bigor"><div class="tt"> </div></div></a></div></div>
            "#,
        );

        let items = ManhuagaAdapter::listing_chain().resolve(&page).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Alpha");
        assert_eq!(
            items[0].cover_url.as_deref(),
            Some("https://manhuaga.com/covers/alpha.webp")
        );
        assert_eq!(items[1].title, "Beta Title");
    }

    #[tokio::test]
    async fn test_images_from_reader_area() {
        let page = StaticPage::new(
            "https://manhuaga.com/series-c1/",
            r#"<div id="readerarea">
                 <img class="ts-main-image" src="https://cdn.test/1.jpg">
                 <img class="ts-main-image" src="https://cdn.test/2.jpg">
               </div>"#,
        );

        let urls = ManhuagaAdapter::image_chain().resolve(&page).await;

        assert_eq!(urls, vec!["https://cdn.test/1.jpg", "https://cdn.test/2.jpg"]);
    }

    #[tokio::test]
    async fn test_images_from_reader_script() {
        let page = StaticPage::new(
            "https://manhuaga.com/series-c1/",
            r#"<div id="readerarea"></div>
               <script>var x = 1;</script>
               <script>ts_reader.run({"post_id":1,"sources":[{"source":"Server 1","images":["https:\/\/cdn.test\/a.jpg","https:\/\/cdn.test\/b.jpg"]}]});</script>"#,
        );

        let urls = ManhuagaAdapter::image_chain().resolve(&page).await;

        assert_eq!(urls, vec!["https://cdn.test/a.jpg", "https://cdn.test/b.jpg"]);
    }

    #[test]
    fn test_reader_script_rejects_broken_json() {
        assert!(reader_script_images("ts_reader.run({not json});").is_none());
        assert!(reader_script_images("console.log(1);").is_none());
    }
}
