//! End-to-end aggregation tests: real adapters over mocked upstreams.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use submerge::cache::AvailabilityCache;
use submerge::config::OpenSubtitlesConfig;
use submerge::model::{ContentIdentity, TargetDescriptor};
use submerge::providers::{
    OpenSubtitlesProvider, RateLimitCoordinator, SubtitleProvider,
};
use submerge::search::{EngineOptions, Resolver, SearchEngine};

fn provider_for(server: &MockServer) -> Arc<dyn SubtitleProvider> {
    let limits = Arc::new(RateLimitCoordinator::new(Duration::from_secs(60)));
    let config = OpenSubtitlesConfig {
        enabled: true,
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        user_agent: "submerge tests".into(),
        requests_per_second: 100,
    };
    Arc::new(OpenSubtitlesProvider::new(&config, limits))
}

fn engine_over(
    providers: Vec<Arc<dyn SubtitleProvider>>,
    dir: &tempfile::TempDir,
) -> SearchEngine {
    let availability = AvailabilityCache::load(
        dir.path().join("availability.json"),
        Duration::from_secs(24 * 3600),
    );
    SearchEngine::new(providers, availability, EngineOptions::default()).unwrap()
}

fn empty_search_body() -> serde_json::Value {
    serde_json::json!({ "total_count": 0, "data": [] })
}

#[tokio::test]
async fn empty_upstream_results_are_cached_against_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .and(query_param("imdb_id", "tt0000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_search_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_over(vec![provider_for(&server)], &dir);
    let identity = ContentIdentity::movie("tt0000001");

    let first = engine.search(&identity, None).await;
    assert!(first.is_empty());

    // Second search within the TTL window: zero upstream calls (the mock
    // would fail verification otherwise) and the same empty set.
    let second = engine.search(&identity, None).await;
    assert!(second.is_empty());

    let summary = engine.availability(&identity).unwrap();
    assert!(!summary.available);
    assert_eq!(summary.count, 0);
}

#[tokio::test]
async fn target_with_hash_triggers_both_search_modes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .and(query_param("imdb_id", "tt1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "attributes": {
                    "language": "en",
                    "download_count": 10,
                    "release": "Movie.2020.720p.WEBRip.x264-AAA",
                    "files": [{"file_id": 1, "file_name": "a.srt"}]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .and(query_param("moviehash", "deadbeef00000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "attributes": {
                    "language": "en",
                    "download_count": 2,
                    "release": "Totally.Different.Release-ZZZ",
                    "files": [{"file_id": 2, "file_name": "b.srt"}]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let engine = engine_over(vec![provider_for(&server)], &dir);

    let target = TargetDescriptor {
        filename: Some("Movie.2020.720p.WEBRip.x264-AAA.mkv".into()),
        content_hash: Some("deadbeef00000000".into()),
        byte_size: Some(1_400_000_000),
    };
    let results = engine
        .search(&ContentIdentity::movie("tt1"), Some(&target))
        .await;

    assert_eq!(results.len(), 2);
    // The hash hit wins despite its unrelated release name.
    assert_eq!(results[0].candidate.download_locator, "2");
    assert_eq!(results[0].match_score, Some(100));
    assert!(results[0].candidate.exact_hash_match);
    assert!(results[1].match_score.unwrap() < 100);
}

#[tokio::test]
async fn concurrent_downloads_coalesce_into_one_upstream_mint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(100))
                .set_body_json(serde_json::json!({"link": "https://cdn.example.net/x.srt"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = Arc::new(Resolver::new(
        &[provider_for(&server)],
        Duration::from_secs(60),
    ));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.resolve("opensubtitles", "55").await })
        })
        .collect();

    for outcome in futures::future::join_all(tasks).await {
        assert_eq!(outcome.unwrap().unwrap(), "https://cdn.example.net/x.srt");
    }
}
