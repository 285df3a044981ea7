mod common;

use std::{sync::Arc, time::Duration};

use common::*;
use tubex::{
    common::errors::ErrorKind,
    sources::{SourceManager, cache::ResultCache, plugin::BoxedSource},
};

fn manager(transport: Arc<FakeTransport>) -> SourceManager {
    let sources: Vec<BoxedSource> = vec![Box::new(source(transport))];
    SourceManager::with_sources(sources, ResultCache::new(8, 4, Duration::from_secs(600)))
}

fn backend() -> Arc<FakeTransport> {
    Arc::new(
        FakeTransport::new()
            .player("WEB", Reply::Json(player_response(VIDEO_ID, None)))
            .player(
                "TVHTML5",
                Reply::Json(player_response(VIDEO_ID, Some(streaming_data("tv.example")))),
            ),
    )
}

#[tokio::test]
async fn equivalent_inputs_share_one_cached_result() {
    let transport = backend();
    let manager = manager(transport.clone());

    let first = manager.fetch_stream_info(VIDEO_ID).await.unwrap();
    let second = manager
        .fetch_stream_info(&format!("https://youtu.be/{VIDEO_ID}"))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.count("player:WEB"), 1);
    assert_eq!(transport.count("player:TVHTML5"), 1);
}

#[tokio::test]
async fn concurrent_requests_extract_once() {
    let transport = backend();
    let manager = manager(transport.clone());

    let (a, b) = futures::join!(
        manager.fetch_stream_info(VIDEO_ID),
        manager.fetch_stream_info(VIDEO_ID)
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(transport.count("player:WEB"), 1);
    assert!(!manager.is_loading("youtube", &format!("https://www.youtube.com/watch?v={VIDEO_ID}")));
}

#[tokio::test]
async fn clearing_caches_forces_a_fresh_extraction() {
    let transport = backend();
    let manager = manager(transport.clone());

    manager.fetch_stream_info(VIDEO_ID).await.unwrap();
    manager.clear_caches();
    manager.fetch_stream_info(VIDEO_ID).await.unwrap();

    assert_eq!(transport.count("player:WEB"), 2);
    assert_eq!(transport.count("script"), 2);
    assert_eq!(transport.count("visitor_id"), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let transport = Arc::new(FakeTransport::new().player("WEB", Reply::Status(429)));
    let manager = manager(transport.clone());

    for _ in 0..2 {
        let err = manager.fetch_stream_info(VIDEO_ID).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }
    assert_eq!(transport.count("player:WEB"), 2);
}

#[tokio::test]
async fn unknown_services_are_rejected() {
    let manager = manager(backend());
    let err = manager
        .fetch_stream_info("https://vimeo.com/76979871")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedUrl);
}
