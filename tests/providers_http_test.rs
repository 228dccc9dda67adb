//! HTTP-level adapter tests against mocked upstreams.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use submerge::config::{OpenSubtitlesConfig, PodnapisiConfig};
use submerge::error::ProviderError;
use submerge::model::ContentIdentity;
use submerge::providers::{
    OpenSubtitlesProvider, PodnapisiProvider, RateLimitCoordinator, SubtitleProvider,
};

fn opensubtitles(base_url: &str, limits: Arc<RateLimitCoordinator>) -> OpenSubtitlesProvider {
    let config = OpenSubtitlesConfig {
        enabled: true,
        api_key: Some("test-key".into()),
        base_url: base_url.to_string(),
        user_agent: "submerge tests".into(),
        requests_per_second: 100,
    };
    OpenSubtitlesProvider::new(&config, limits)
}

fn limits_with_cooldown(cooldown: Duration) -> Arc<RateLimitCoordinator> {
    Arc::new(RateLimitCoordinator::new(cooldown))
}

fn search_body() -> serde_json::Value {
    serde_json::json!({
        "total_count": 1,
        "data": [{
            "id": "901",
            "type": "subtitle",
            "attributes": {
                "language": "en",
                "download_count": 512,
                "hearing_impaired": false,
                "fps": 23.976,
                "moviehash_match": false,
                "release": "Movie.2020.1080p.BluRay.x264-GROUP",
                "files": [{"file_id": 111, "file_name": "movie.srt"}]
            }
        }]
    })
}

#[tokio::test]
async fn opensubtitles_identity_search_maps_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .and(query_param("imdb_id", "tt0111161"))
        .and(header("Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = opensubtitles(&server.uri(), limits_with_cooldown(Duration::from_secs(60)));
    let candidates = provider
        .search_by_identity(&ContentIdentity::movie("tt0111161"))
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].release_label, "Movie.2020.1080p.BluRay.x264-GROUP");
    assert_eq!(candidates[0].download_locator, "111");
    assert_eq!(candidates[0].popularity, 512.0);
    assert!(!candidates[0].exact_hash_match);
}

#[tokio::test]
async fn opensubtitles_series_search_sends_season_and_episode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .and(query_param("imdb_id", "tt0108778"))
        .and(query_param("season_number", "2"))
        .and(query_param("episode_number", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = opensubtitles(&server.uri(), limits_with_cooldown(Duration::from_secs(60)));
    let candidates = provider
        .search_by_identity(&ContentIdentity::episode("tt0108778", 2, 5))
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
}

#[tokio::test]
async fn opensubtitles_hash_search_forces_exact_match_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .and(query_param("moviehash", "8e245d9679d31e12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = opensubtitles(&server.uri(), limits_with_cooldown(Duration::from_secs(60)));
    let candidates = provider
        .search_by_hash("8e245d9679d31e12", Some(700_000_000))
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    // Upstream said moviehash_match = false, but hash-search results are
    // exact by definition.
    assert!(candidates[0].exact_hash_match);
}

#[tokio::test]
async fn throttling_enters_cooldown_and_suppresses_the_next_call() {
    let server = MockServer::start().await;
    // Exactly one request must reach the upstream; the second search happens
    // inside the cooldown window and short-circuits.
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let limits = limits_with_cooldown(Duration::from_millis(80));
    let provider = opensubtitles(&server.uri(), limits.clone());
    let identity = ContentIdentity::movie("tt0111161");

    let first = provider.search_by_identity(&identity).await;
    assert!(matches!(first, Err(ProviderError::Throttled { .. })));
    assert!(!limits.is_eligible("opensubtitles"));

    let second = provider.search_by_identity(&identity).await.unwrap();
    assert!(second.is_empty());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(limits.is_eligible("opensubtitles"));
}

#[tokio::test]
async fn retry_after_header_sets_the_cooldown_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .expect(1)
        .mount(&server)
        .await;

    let limits = limits_with_cooldown(Duration::from_secs(1));
    let provider = opensubtitles(&server.uri(), limits.clone());

    let result = provider
        .search_by_identity(&ContentIdentity::movie("tt1"))
        .await;
    match result {
        Err(ProviderError::Throttled { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(120)));
        }
        other => panic!("expected throttled, got {other:?}"),
    }
    let remaining = limits.cooldown_remaining("opensubtitles").unwrap();
    assert!(remaining > Duration::from_secs(110));
}

#[tokio::test]
async fn opensubtitles_resolves_download_links() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_json(serde_json::json!({"file_id": 111})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "link": "https://cdn.example.net/movie.srt",
            "file_name": "movie.srt",
            "requests": 1,
            "remaining": 99
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = opensubtitles(&server.uri(), limits_with_cooldown(Duration::from_secs(60)));
    let link = provider.resolve_download("111").await.unwrap();
    assert_eq!(link, "https://cdn.example.net/movie.srt");
}

#[tokio::test]
async fn resolution_during_cooldown_surfaces_the_throttle() {
    let server = MockServer::start().await;
    // No request must reach the upstream at all.
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let limits = limits_with_cooldown(Duration::from_secs(60));
    limits.mark_throttled("opensubtitles", Some(Duration::from_secs(30)));
    let provider = opensubtitles(&server.uri(), limits);

    match provider.resolve_download("111").await {
        Err(ProviderError::Throttled { retry_after }) => {
            let remaining = retry_after.expect("cooldown should carry a retry hint");
            assert!(remaining <= Duration::from_secs(30));
        }
        other => panic!("expected throttled, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_payload_is_reported_as_such() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let provider = opensubtitles(&server.uri(), limits_with_cooldown(Duration::from_secs(60)));
    let result = provider
        .search_by_identity(&ContentIdentity::movie("tt1"))
        .await;
    assert!(matches!(result, Err(ProviderError::Malformed(_))));
}

#[tokio::test]
async fn podnapisi_search_maps_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subtitles/search/advanced"))
        .and(query_param("keywords", "tt0111161"))
        .and(query_param("movie_type", "movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "abc",
                "language": "en",
                "releases": ["Movie.2020.720p.WEBRip-TEAM"],
                "title": "Movie",
                "download": "/subtitles/abc/download",
                "downloads": 33
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let limits = limits_with_cooldown(Duration::from_secs(60));
    let provider = PodnapisiProvider::new(
        &PodnapisiConfig {
            enabled: true,
            base_url: server.uri(),
        },
        limits,
    );

    let candidates = provider
        .search_by_identity(&ContentIdentity::movie("tt0111161"))
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].release_label, "Movie.2020.720p.WEBRip-TEAM");
    // Direct URL, anchored to the provider host.
    assert_eq!(
        candidates[0].download_locator,
        format!("{}/subtitles/abc/download", server.uri())
    );
    assert!(!candidates[0].exact_hash_match);
}
