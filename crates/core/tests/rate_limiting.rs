//! Pacing, 429 retries and cancellation seen through a connector.

use std::sync::Arc;
use std::time::Duration;

use mangawatch_core::resilience::HttpResponse;
use mangawatch_core::testing::{fixtures, MockTransport};
use mangawatch_core::{CallContext, Connector, ConnectorError, MgekoConnector, NativeOptions};

const PAGE: &str = r#"<html><head><meta property="og:title" content="Omniscient Reader - MangaGeko"></head>
<body><a href="/reader/en/omniscient-reader-chapter-205-eng-li/">205</a></body></html>"#;

const SERIES: &str = "https://www.mgeko.cc/manga/omniscient-reader/";

fn setup() -> (Arc<MockTransport>, MgekoConnector) {
    let transport = Arc::new(MockTransport::new());
    let connector = MgekoConnector::new(&NativeOptions::new(transport.clone())).unwrap();
    (transport, connector)
}

#[tokio::test(start_paused = true)]
async fn test_requests_are_spaced() {
    let (transport, connector) = setup();
    transport.respond_ok(SERIES, PAGE).await;
    let ctx = CallContext::background();

    for _ in 0..3 {
        connector.resolve_by_url(&ctx, SERIES).await.unwrap();
    }

    let recorded = transport.recorded().await;
    assert_eq!(recorded.len(), 3);
    for pair in recorded.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(750));
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_is_honored_then_succeeds() {
    let (transport, connector) = setup();
    transport
        .enqueue(SERIES, HttpResponse::new(429, "").with_header("Retry-After", "3"))
        .await;
    transport.respond_ok(SERIES, PAGE).await;

    let result = connector
        .resolve_by_url(&CallContext::background(), SERIES)
        .await
        .unwrap();
    assert_eq!(result.latest_chapter, Some(205.0));

    let recorded = transport.recorded().await;
    assert_eq!(recorded.len(), 2);
    let gap = recorded[1].at - recorded[0].at;
    assert!(gap >= Duration::from_secs(3), "gap was {:?}", gap);
    assert!(gap < Duration::from_secs(4), "gap was {:?}", gap);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_429_surfaces_rate_limited() {
    let (transport, connector) = setup();
    transport.respond(SERIES, HttpResponse::new(429, "")).await;

    let err = connector
        .resolve_by_url(&CallContext::background(), SERIES)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::RateLimited { attempts: 4, .. }));
    assert_eq!(transport.request_count(SERIES).await, 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let (transport, connector) = setup();
    transport.respond(SERIES, HttpResponse::new(429, "")).await;
    let (ctx, cancel) = CallContext::cancellable();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let err = connector.resolve_by_url(&ctx, SERIES).await.unwrap_err();
    assert_eq!(err, ConnectorError::Cancelled);
    assert_eq!(transport.request_count(SERIES).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_sitemap_fails_search() {
    let (transport, connector) = setup();
    transport
        .respond_ok(
            "https://www.mgeko.cc/search/?search=reader",
            fixtures::html_page("Search", "<ul></ul>"),
        )
        .await;
    transport
        .respond(
            "https://www.mgeko.cc/sitemap.xml",
            HttpResponse::new(429, ""),
        )
        .await;

    let err = connector
        .search_by_title(&CallContext::background(), "reader", 5)
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}
