//! Subtitle search, availability, and lazy download routes.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::{ContentIdentity, MediaKind, RankedCandidate, TargetDescriptor};
use crate::server::AppContext;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/subtitles/:kind/:id", get(search_subtitles))
        .route("/availability/:kind/:id", get(availability))
        .route("/download/:provider/:file_id", get(download))
}

#[derive(Deserialize)]
struct SearchQuery {
    /// Release filename of the caller's media file.
    filename: Option<String>,
    /// Content hash of the caller's media file.
    hash: Option<String>,
    /// Size of the caller's media file in bytes.
    size: Option<u64>,
}

#[derive(Serialize)]
struct SubtitlesResponse {
    subtitles: Vec<SubtitleItem>,
}

#[derive(Serialize)]
struct SubtitleItem {
    provider: String,
    release: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    hearing_impaired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<u8>,
    /// Service-local redirect path for lazily resolved providers, the
    /// provider's direct URL otherwise.
    url: String,
}

impl SubtitleItem {
    fn from_ranked(ranked: &RankedCandidate, ctx: &AppContext) -> Self {
        let candidate = &ranked.candidate;
        let url = if ctx.resolver.handles(&candidate.provider_id) {
            format!(
                "/download/{}/{}",
                candidate.provider_id, candidate.download_locator
            )
        } else {
            candidate.download_locator.clone()
        };

        Self {
            provider: candidate.provider_id.clone(),
            release: candidate.release_label.clone(),
            language: candidate.quality_hints.get("language").cloned(),
            hearing_impaired: candidate.hearing_impaired,
            score: ranked.match_score,
            url,
        }
    }
}

fn parse_identity(kind: &str, id: &str) -> Result<ContentIdentity, Response> {
    let kind = MediaKind::from_path_segment(kind)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    ContentIdentity::parse(kind, id)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "malformed content id").into_response())
}

async fn search_subtitles(
    State(ctx): State<AppContext>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let identity = match parse_identity(&kind, &id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let target = TargetDescriptor {
        filename: query.filename,
        content_hash: query.hash,
        byte_size: query.size,
    };
    let target = if target.is_empty() { None } else { Some(&target) };

    let ranked = ctx.engine.search(&identity, target).await;
    let subtitles = ranked
        .iter()
        .map(|r| SubtitleItem::from_ranked(r, &ctx))
        .collect();

    Json(SubtitlesResponse { subtitles }).into_response()
}

async fn availability(
    State(ctx): State<AppContext>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    let identity = match parse_identity(&kind, &id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    match ctx.engine.availability(&identity) {
        Some(entry) => Json(serde_json::json!({
            "available": entry.available,
            "count": entry.count,
            "checked_at": entry.checked_at,
        }))
        .into_response(),
        // Never checked (or expired): distinct from "checked and empty",
        // which returns 200 with available = false.
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn download(
    State(ctx): State<AppContext>,
    Path((provider, file_id)): Path<(String, String)>,
) -> Response {
    match ctx.resolver.resolve(&provider, &file_id).await {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(err @ ProviderError::Throttled { .. }) => {
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, err.to_string()).into_response();
            if let Some(secs) = err.retry_after_secs() {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
            response
        }
        Err(ProviderError::NotFound) | Err(ProviderError::Unsupported) => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}
