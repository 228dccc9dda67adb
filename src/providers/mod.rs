//! Provider adapters and shared throttling state.

use std::time::Duration;

pub mod opensubtitles;
pub mod podnapisi;
pub mod provider;
pub mod ratelimit;

pub use opensubtitles::OpenSubtitlesProvider;
pub use podnapisi::PodnapisiProvider;
pub use provider::SubtitleProvider;
pub use ratelimit::RateLimitCoordinator;

/// Parse an HTTP `Retry-After` header as a whole-seconds delay. Date-form
/// values are ignored; the caller falls back to its default cooldown.
pub(crate) fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
