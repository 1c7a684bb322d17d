//! Site adapters driven through the scraper against mock sites.

mod support;

use mangadl_core::ScrapeError;
use mangadl_core::adapter::{ManhuafastAdapter, ManhuagaAdapter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use support::fixtures::{fast_config, madara_series_page, mount_html, mount_status, scraper_with};
use support::socket_guard::start_mock_server_or_skip;

#[tokio::test]
async fn test_madara_listing_reads_theme_cards() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(
        &server,
        "/",
        r#"<div class="page-item-detail manga">
             <div class="item-summary"><div class="post-title"><h3><a href="/manga/alpha/">Alpha</a></h3></div></div>
           </div>
           <div class="page-item-detail manga">
             <div class="item-summary"><div class="post-title"><h3><a href="/manga/beta/">Beta</a></h3></div></div>
           </div>"#
            .to_string(),
    )
    .await;
    let adapter = ManhuafastAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());

    let series = scraper
        .list_top_level(&format!("{}/", server.uri()))
        .await
        .unwrap();

    let titles: Vec<&str> = series.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Beta"]);
    assert_eq!(series[0].url, format!("{}/manga/alpha/", server.uri()));
}

#[tokio::test]
async fn test_madara_listing_falls_back_to_archive_page() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(&server, "/", "<p>Redesigned home page</p>".to_string()).await;
    mount_html(
        &server,
        "/manga/",
        r#"<a href="/manga/alpha/">Alpha</a><a href="/manga/alpha/chapter/1/">Chapter 1</a>"#
            .to_string(),
    )
    .await;
    let adapter = ManhuafastAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());

    let series = scraper
        .list_top_level(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].title, "Alpha");
}

#[tokio::test]
async fn test_madara_chapters_are_oldest_first_and_stable() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(
        &server,
        "/manga/alpha/",
        madara_series_page(&[
            ("/manga/alpha/chapter-1/", "Chapter 1"),
            ("/manga/alpha/chapter-2/", "Chapter 2"),
            ("/manga/alpha/chapter-3/", "Chapter 3"),
        ]),
    )
    .await;
    let adapter = ManhuafastAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());
    let series_url = format!("{}/manga/alpha/", server.uri());

    let first = scraper.list_sub_items(&series_url).await.unwrap();
    let second = scraper.list_sub_items(&series_url).await.unwrap();

    let titles: Vec<&str> = first.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);
    assert_eq!(
        first[0].url,
        format!("{}/manga/alpha/chapter-1/", server.uri())
    );
    assert_eq!(first[0].published_at.as_deref(), Some("Jan 1, 2024"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_mangareader_chapters_renumbered_from_site_order() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(
        &server,
        "/manga/beta/",
        r#"<div id="chapterlist"><ul>
             <li data-num="2"><a href="/beta-chapter-2/"><span class="chapternum">Chapter 2</span></a></li>
             <li data-num="1"><a href="/beta-chapter-1/"><span class="chapternum">Chapter 1</span></a></li>
           </ul></div>"#
            .to_string(),
    )
    .await;
    let adapter = ManhuagaAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());

    let chapters = scraper
        .list_sub_items(&format!("{}/manga/beta/", server.uri()))
        .await
        .unwrap();

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Chapter 1");
    assert!(chapters[0].url.ends_with("/beta-chapter-1/"));
    assert_eq!(chapters[1].sequence_hint.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_navigation_retries_transient_page_errors() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/manga/alpha/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/manga/alpha/",
        madara_series_page(&[("/manga/alpha/chapter-1/", "Chapter 1")]),
    )
    .await;
    let adapter = ManhuafastAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());

    let chapters = scraper
        .list_sub_items(&format!("{}/manga/alpha/", server.uri()))
        .await
        .unwrap();

    assert_eq!(chapters.len(), 1);
}

#[tokio::test]
async fn test_navigation_gives_up_after_configured_attempts() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_status(&server, "/manga/gone/", 500).await;
    let adapter = ManhuafastAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());

    let err = scraper
        .list_sub_items(&format!("{}/manga/gone/", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Navigation { attempts: 2, .. }));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_unsupported_site_is_rejected_before_loading() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let adapter = ManhuafastAdapter::with_base_url(&server.uri()).unwrap();
    let scraper = scraper_with(Box::new(adapter), fast_config());

    let err = scraper
        .list_sub_items("https://unknown.example/manga/x/")
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::UnsupportedSite { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
