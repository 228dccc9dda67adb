//! Podnapisi provider.
//!
//! Identity-search-only adapter for the Podnapisi advanced search API. The
//! results carry directly usable download URLs, so this provider declares
//! neither the hash-search nor the resolution capability. No credentials are
//! required.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::PodnapisiConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::model::{Candidate, ContentIdentity, MediaKind};
use crate::providers::{retry_after_header, RateLimitCoordinator, SubtitleProvider};

const PROVIDER_NAME: &str = "podnapisi";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SubtitleEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    language: Option<String>,
    #[serde(default)]
    releases: Vec<String>,
    title: Option<String>,
    download: Option<String>,
    downloads: Option<u64>,
}

pub struct PodnapisiProvider {
    client: reqwest::Client,
    base_url: String,
    limits: Arc<RateLimitCoordinator>,
}

impl PodnapisiProvider {
    pub fn new(config: &PodnapisiConfig, limits: Arc<RateLimitCoordinator>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limits,
        }
    }
}

fn to_candidate(entry: SubtitleEntry, base_url: &str) -> Option<Candidate> {
    // Entries without a download path cannot be served at all.
    let download = entry.download?;
    let locator = if download.starts_with("http") {
        download
    } else {
        format!("{base_url}{download}")
    };

    let release_label = entry
        .releases
        .first()
        .cloned()
        .or(entry.title)
        .unwrap_or_default();

    let mut quality_hints = HashMap::new();
    if let Some(lang) = entry.language {
        quality_hints.insert("language".to_string(), lang);
    }

    Some(Candidate {
        provider_id: PROVIDER_NAME.to_string(),
        release_label,
        download_locator: locator,
        quality_hints,
        hearing_impaired: false,
        popularity: entry.downloads.unwrap_or(0) as f64,
        exact_hash_match: false,
    })
}

#[async_trait]
impl SubtitleProvider for PodnapisiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search_by_identity(
        &self,
        identity: &ContentIdentity,
    ) -> ProviderResult<Vec<Candidate>> {
        if !self.limits.is_eligible(PROVIDER_NAME) {
            debug!("podnapisi in cooldown, skipping search");
            return Ok(Vec::new());
        }

        let mut params = vec![("keywords", identity.external_id.clone())];
        match identity.kind {
            MediaKind::Movie => params.push(("movie_type", "movie".to_string())),
            MediaKind::Series => {
                params.push(("movie_type", "tv-series".to_string()));
                if let (Some(season), Some(episode)) = (identity.season, identity.episode) {
                    params.push(("seasons", season.to_string()));
                    params.push(("episodes", episode.to_string()));
                }
            }
        }

        let url = format!("{}/subtitles/search/advanced", self.base_url);
        debug!(url = %url, ?params, "podnapisi search");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let suggested = retry_after_header(response.headers());
                let applied = self.limits.mark_throttled(PROVIDER_NAME, suggested);
                return Err(ProviderError::Throttled {
                    retry_after: Some(applied),
                });
            }
            status if !status.is_success() => {
                return Err(ProviderError::Unavailable(format!("HTTP {status}")));
            }
            _ => {}
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let base = self.base_url.clone();
        Ok(body
            .data
            .into_iter()
            .filter_map(|entry| to_candidate(entry, &base))
            .collect())
    }
}
