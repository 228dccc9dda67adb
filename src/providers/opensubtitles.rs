//! OpenSubtitles provider.
//!
//! Implements [`SubtitleProvider`] against the OpenSubtitles REST API.
//!
//! Capabilities:
//! - Identity search (IMDb id, plus season/episode for series).
//! - Content-hash search; hash hits are exact matches by definition.
//! - Two-phase download resolution: search returns file ids, a second call
//!   mints a short-lived download URL.
//!
//! The adapter paces itself with a token bucket under the provider's
//! published quota, and on an explicit 429 records a cooldown in the shared
//! [`RateLimitCoordinator`] instead of retrying within the call.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::OpenSubtitlesConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::model::{Candidate, ContentIdentity, MediaKind};
use crate::providers::{retry_after_header, RateLimitCoordinator, SubtitleProvider};

const PROVIDER_NAME: &str = "opensubtitles";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SubtitleItem>,
}

#[derive(Debug, Deserialize)]
struct SubtitleItem {
    attributes: SubtitleAttributes,
}

#[derive(Debug, Deserialize)]
struct SubtitleAttributes {
    language: Option<String>,
    download_count: Option<u64>,
    hearing_impaired: Option<bool>,
    fps: Option<f64>,
    moviehash_match: Option<bool>,
    release: Option<String>,
    #[serde(default)]
    files: Vec<SubtitleFile>,
}

#[derive(Debug, Deserialize)]
struct SubtitleFile {
    file_id: u64,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    link: String,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

pub struct OpenSubtitlesProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    limits: Arc<RateLimitCoordinator>,
    pacer: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OpenSubtitlesProvider {
    pub fn new(config: &OpenSubtitlesConfig, limits: Arc<RateLimitCoordinator>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        let per_second = NonZeroU32::new(config.requests_per_second.max(1)).unwrap();
        let pacer = RateLimiter::direct(Quota::per_second(per_second));

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            user_agent: config.user_agent.clone(),
            limits,
            pacer,
        }
    }

    /// Send a prepared request under the pacing quota and translate the
    /// status line into the error taxonomy. A 429 records the cooldown as a
    /// side effect; the call itself is never retried.
    async fn dispatch(&self, request: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        self.pacer.until_ready().await;

        let response = request
            .header("Api-Key", &self.api_key)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let suggested = retry_after_header(response.headers());
                let applied = self.limits.mark_throttled(PROVIDER_NAME, suggested);
                Err(ProviderError::Throttled {
                    retry_after: Some(applied),
                })
            }
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound),
            status if !status.is_success() => {
                Err(ProviderError::Unavailable(format!("HTTP {status}")))
            }
            _ => Ok(response),
        }
    }

    async fn search(&self, params: &[(&str, String)]) -> ProviderResult<Vec<Candidate>> {
        let url = format!("{}/subtitles", self.base_url);
        debug!(url = %url, ?params, "opensubtitles search");

        let body: SearchResponse = self
            .dispatch(self.client.get(&url).query(params))
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(body.data.into_iter().flat_map(to_candidates).collect())
    }
}

/// Flatten one API item into candidates, one per downloadable file.
fn to_candidates(item: SubtitleItem) -> Vec<Candidate> {
    let attrs = item.attributes;

    let mut quality_hints = HashMap::new();
    if let Some(lang) = &attrs.language {
        quality_hints.insert("language".to_string(), lang.clone());
    }
    if let Some(fps) = attrs.fps {
        quality_hints.insert("fps".to_string(), fps.to_string());
    }

    attrs
        .files
        .iter()
        .map(|file| Candidate {
            provider_id: PROVIDER_NAME.to_string(),
            release_label: attrs
                .release
                .clone()
                .or_else(|| file.file_name.clone())
                .unwrap_or_default(),
            download_locator: file.file_id.to_string(),
            quality_hints: quality_hints.clone(),
            hearing_impaired: attrs.hearing_impaired.unwrap_or(false),
            popularity: attrs.download_count.unwrap_or(0) as f64,
            exact_hash_match: attrs.moviehash_match.unwrap_or(false),
        })
        .collect()
}

#[async_trait]
impl SubtitleProvider for OpenSubtitlesProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn supports_hash_search(&self) -> bool {
        true
    }

    fn supports_resolution(&self) -> bool {
        true
    }

    async fn search_by_identity(
        &self,
        identity: &ContentIdentity,
    ) -> ProviderResult<Vec<Candidate>> {
        if !self.limits.is_eligible(PROVIDER_NAME) {
            debug!("opensubtitles in cooldown, skipping identity search");
            return Ok(Vec::new());
        }

        let mut params = vec![("imdb_id", identity.external_id.clone())];
        if identity.kind == MediaKind::Series {
            if let (Some(season), Some(episode)) = (identity.season, identity.episode) {
                params.push(("season_number", season.to_string()));
                params.push(("episode_number", episode.to_string()));
            }
        }

        self.search(&params).await
    }

    async fn search_by_hash(
        &self,
        hash: &str,
        _byte_size: Option<u64>,
    ) -> ProviderResult<Vec<Candidate>> {
        if !self.limits.is_eligible(PROVIDER_NAME) {
            debug!("opensubtitles in cooldown, skipping hash search");
            return Ok(Vec::new());
        }

        let params = vec![("moviehash", hash.to_string())];
        let mut candidates = self.search(&params).await?;
        // Hash search results are exact matches by definition, whatever the
        // per-item flag said.
        for candidate in &mut candidates {
            candidate.exact_hash_match = true;
        }
        Ok(candidates)
    }

    async fn resolve_download(&self, file_id: &str) -> ProviderResult<String> {
        if !self.limits.is_eligible(PROVIDER_NAME) {
            // Resolution has a single upstream target; surface the cooldown
            // instead of degrading to "not found".
            return Err(ProviderError::Throttled {
                retry_after: self.limits.cooldown_remaining(PROVIDER_NAME),
            });
        }

        let id: u64 = file_id.parse().map_err(|_| ProviderError::NotFound)?;
        let url = format!("{}/download", self.base_url);
        debug!(url = %url, file_id = id, "opensubtitles resolve download");

        let body: DownloadResponse = self
            .dispatch(
                self.client
                    .post(&url)
                    .json(&serde_json::json!({ "file_id": id })),
            )
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(body.link)
    }
}
