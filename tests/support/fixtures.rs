//! Mock site pages, page images and scraper wiring.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use mangadl_core::adapter::SiteAdapter;
use mangadl_core::asset::HttpAssetFetcher;
use mangadl_core::render::HttpRenderProvider;
use mangadl_core::{AdapterRegistry, MangaScraper, ScraperConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_USER_AGENT: &str = "mangadl-tests/1.0";

/// A solid-color PNG page.
#[must_use]
pub fn png_page(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 255 - shade]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png fixture");
    bytes.into_inner()
}

/// Config with short delays so retry paths finish quickly.
#[must_use]
pub fn fast_config() -> ScraperConfig {
    ScraperConfig {
        navigation_attempts: 2,
        navigation_delay: Duration::from_millis(10),
        navigation_timeout: Duration::from_secs(5),
        selector_wait: Duration::from_millis(200),
        asset_concurrency: 3,
        asset_attempts: 1,
        item_attempts: 2,
        item_cooldown: Duration::from_millis(10),
        user_agent: TEST_USER_AGENT.to_string(),
        ..ScraperConfig::default()
    }
}

/// Scraper whose only adapter is `adapter`, using real HTTP collaborators.
#[must_use]
pub fn scraper_with(adapter: Box<dyn SiteAdapter>, config: ScraperConfig) -> MangaScraper {
    let mut registry = AdapterRegistry::new();
    registry.register(adapter);
    let provider = HttpRenderProvider::new(TEST_USER_AGENT).expect("render provider");
    let fetcher = HttpAssetFetcher::new(TEST_USER_AGENT).expect("asset fetcher");
    MangaScraper::with_parts(config, registry, Arc::new(provider), Arc::new(fetcher))
        .expect("valid scraper config")
}

/// Serves `body` as HTML at `route`.
pub async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Serves `bytes` as a PNG at `route`.
pub async fn mount_png(server: &MockServer, route: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(bytes),
        )
        .mount(server)
        .await;
}

/// Serves a bare status at `route`.
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Madara-theme series page listing `chapters` (route, title) newest first.
#[must_use]
pub fn madara_series_page(chapters: &[(&str, &str)]) -> String {
    let rows: String = chapters
        .iter()
        .rev()
        .map(|(route, title)| {
            format!(
                r#"<li class="wp-manga-chapter"><a href="{route}">{title}</a>
                   <span class="chapter-release-date"><i>Jan 1, 2024</i></span></li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="listing-chapters_wrap"><ul class="main version-chap">{rows}</ul></div></body></html>"#
    )
}

/// Madara-theme reader page showing `image_urls` in order.
#[must_use]
pub fn madara_chapter_page(image_urls: &[String]) -> String {
    let images: String = image_urls
        .iter()
        .map(|url| format!(r#"<div class="page-break no-gaps"><img src="{url}"></div>"#))
        .collect();
    format!(r#"<html><body><div class="reading-content">{images}</div></body></html>"#)
}
