//! Core data types shared across the search engine.
//!
//! This module defines the content identity used as the cache and query key,
//! the optional per-request target descriptor, and the candidate types
//! produced by providers and returned to callers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Content identity
// ---------------------------------------------------------------------------

/// Whether an identity refers to a standalone movie or a single episode of a
/// series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Parse the kind segment of a request path (`"movie"` / `"series"`).
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "movie" => Some(MediaKind::Movie),
            "series" => Some(MediaKind::Series),
            _ => None,
        }
    }
}

/// The tuple identifying one piece of media across providers.
///
/// Equality is structural; an identity is the cache key for both the search
/// result cache and the availability cache, so every distinguishing field
/// participates in [`cache_key`](Self::cache_key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIdentity {
    /// Immutable external identifier, e.g. `"tt0108778"`.
    pub external_id: String,
    pub kind: MediaKind,
    /// Season number; only meaningful for [`MediaKind::Series`].
    pub season: Option<u32>,
    /// Episode number; only meaningful for [`MediaKind::Series`].
    pub episode: Option<u32>,
}

impl ContentIdentity {
    pub fn movie(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            kind: MediaKind::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(external_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            external_id: external_id.into(),
            kind: MediaKind::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// Parse a request id like `"tt0108778"` (movie) or `"tt0108778:2:5"`
    /// (series, season 2 episode 5).
    pub fn parse(kind: MediaKind, raw: &str) -> Option<Self> {
        match kind {
            MediaKind::Movie => {
                if raw.is_empty() || raw.contains(':') {
                    return None;
                }
                Some(Self::movie(raw))
            }
            MediaKind::Series => {
                let mut parts = raw.split(':');
                let id = parts.next().filter(|p| !p.is_empty())?;
                let season = parts.next()?.parse().ok()?;
                let episode = parts.next()?.parse().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                Some(Self::episode(id, season, episode))
            }
        }
    }

    /// Deterministic string form used as the key in the search result and
    /// availability caches. Includes every distinguishing field so a movie
    /// and an episode sharing an external id never collide.
    pub fn cache_key(&self) -> String {
        match self.kind {
            MediaKind::Movie => format!("movie:{}", self.external_id),
            MediaKind::Series => format!(
                "series:{}:{}:{}",
                self.external_id,
                self.season.unwrap_or(0),
                self.episode.unwrap_or(0)
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Target descriptor
// ---------------------------------------------------------------------------

/// Optional description of the media file the caller wants subtitles for.
///
/// Request-scoped; never part of a cache key, so unrelated targets can reuse
/// the same cached candidate set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetDescriptor {
    /// Release filename, e.g. `"Movie.2020.1080p.BluRay.x264-GROUP.mkv"`.
    pub filename: Option<String>,
    /// Content hash of the video file (OpenSubtitles movie-hash format).
    pub content_hash: Option<String>,
    /// Size of the video file in bytes.
    pub byte_size: Option<u64>,
}

impl TargetDescriptor {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.content_hash.is_none() && self.byte_size.is_none()
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// One provider's proposed subtitle match for a content identity.
///
/// Immutable once produced by an adapter; derived ranking data lives on
/// [`RankedCandidate`] instead of being patched in here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Name of the provider that produced this candidate.
    pub provider_id: String,
    /// Free-text release name the subtitle was made for.
    pub release_label: String,
    /// Opaque provider-specific locator. For providers with lazy resolution
    /// this is an upstream resource id; otherwise a directly usable URL.
    pub download_locator: String,
    /// Loose provider metadata (language, fps, format, ...).
    pub quality_hints: HashMap<String, String>,
    pub hearing_impaired: bool,
    /// Rating or download count; provider-specific scale, only compared
    /// between candidates as a tie-break.
    pub popularity: f64,
    /// True when the provider located this candidate via a content-hash
    /// lookup, implying byte-level correspondence to the target file.
    pub exact_hash_match: bool,
}

/// A candidate plus its match score against the request's target descriptor.
///
/// `match_score` stays `None` when no scoring evidence existed (target absent
/// or without a filename), distinguishable from a computed score of zero.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u8>,
}
