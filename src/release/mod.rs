//! Release descriptor parsing.
//!
//! Extracts structured tokens (release group, quality tier, source, codec,
//! year) from a free-text release name or filename, plus a normalized token
//! set for fuzzy overlap scoring. Parsing is deterministic: a field that is
//! not recognized stays unset, never guessed.

use std::collections::HashSet;

pub mod score;

pub use score::score;

// ---------------------------------------------------------------------------
// Field enums
// ---------------------------------------------------------------------------

/// Video quality tier, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    _2160p,
    _1080p,
    _720p,
    _480p,
    /// No explicit resolution marker, but an HDTV tag implies broadcast SD/HD.
    Hdtv,
}

/// Rip source, in match-precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    BluRay,
    WebRip,
    WebDl,
    Hdtv,
    DvdRip,
}

/// Video codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    X265,
    X264,
}

// ---------------------------------------------------------------------------
// Parsed release
// ---------------------------------------------------------------------------

/// Structured view of a release name.
#[derive(Debug, Clone, Default)]
pub struct ParsedRelease {
    /// Lowercased tokens (separators collapsed, tokens of length <= 2
    /// discarded), used for fuzzy overlap scoring.
    pub tokens: HashSet<String>,
    /// Release group: the single token after the last hyphen, extension
    /// stripped. Hyphenated and bracket-wrapped group names are not
    /// special-cased; the trailing-token heuristic is part of the ranking
    /// contract.
    pub group: Option<String>,
    pub quality: Option<QualityTier>,
    pub source: Option<SourceType>,
    pub codec: Option<Codec>,
    /// Four-digit year in [1900, 2099], bounded by separators or brackets.
    pub year: Option<String>,
}

/// Parse a release name or filename into its structured fields.
pub fn parse(name: &str) -> ParsedRelease {
    let stem = strip_extension(name);

    let normalized = normalize(stem);
    let raw_tokens: Vec<&str> = normalized.split_whitespace().collect();
    let squashed: String = raw_tokens.concat();

    let tokens = raw_tokens
        .iter()
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect();

    let year = raw_tokens
        .iter()
        .find(|t| is_year(t))
        .map(|t| t.to_string());

    ParsedRelease {
        tokens,
        group: extract_group(stem),
        quality: detect_quality(&squashed),
        source: detect_source(&squashed),
        codec: detect_codec(&squashed),
        year,
    }
}

/// Lowercase and collapse every non-alphanumeric character (separators,
/// brackets, whitespace) to a single space.
fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect()
}

/// Drop a trailing file extension of 2-4 alphanumeric characters containing
/// at least one letter. The letter requirement keeps a trailing year token
/// (`"Movie.2020"`) from being mistaken for an extension.
fn strip_extension(name: &str) -> &str {
    if let Some(idx) = name.rfind('.') {
        let ext = &name[idx + 1..];
        if (2..=4).contains(&ext.len())
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
            && ext.chars().any(|c| c.is_ascii_alphabetic())
        {
            return &name[..idx];
        }
    }
    name
}

/// The token following the last hyphen of the extension-stripped name.
fn extract_group(stem: &str) -> Option<String> {
    let idx = stem.rfind('-')?;
    let group = stem[idx + 1..].trim();
    if group.is_empty() {
        None
    } else {
        Some(group.to_string())
    }
}

fn detect_quality(squashed: &str) -> Option<QualityTier> {
    if squashed.contains("2160p") || squashed.contains("4k") {
        Some(QualityTier::_2160p)
    } else if squashed.contains("1080p") {
        Some(QualityTier::_1080p)
    } else if squashed.contains("720p") {
        Some(QualityTier::_720p)
    } else if squashed.contains("480p") {
        Some(QualityTier::_480p)
    } else if squashed.contains("hdtv") {
        Some(QualityTier::Hdtv)
    } else {
        None
    }
}

fn detect_source(squashed: &str) -> Option<SourceType> {
    // First match in precedence order wins; separator tolerance comes from
    // matching against the squashed form ("web-dl", "web_dl", "web.dl" all
    // collapse to "webdl").
    if squashed.contains("bluray") {
        Some(SourceType::BluRay)
    } else if squashed.contains("webrip") {
        Some(SourceType::WebRip)
    } else if squashed.contains("webdl") {
        Some(SourceType::WebDl)
    } else if squashed.contains("hdtv") {
        Some(SourceType::Hdtv)
    } else if squashed.contains("dvdrip") {
        Some(SourceType::DvdRip)
    } else {
        None
    }
}

fn detect_codec(squashed: &str) -> Option<Codec> {
    if squashed.contains("x265") || squashed.contains("hevc") {
        Some(Codec::X265)
    } else if squashed.contains("x264") || squashed.contains("avc") {
        Some(Codec::X264)
    } else {
        None
    }
}

fn is_year(token: &str) -> bool {
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && matches!(token.parse::<u16>(), Ok(y) if (1900..=2099).contains(&y))
}
