//! Per-provider cooldown tracking.
//!
//! When an upstream answers with an explicit throttling signal, its adapter
//! records a cooldown window here; until the window passes, every adapter
//! call for that provider short-circuits to an empty result without a
//! network round-trip. State is process-lifetime only.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

/// Shared cooldown table consulted by every provider adapter before it dials
/// out. A provider with no recorded cooldown is eligible.
pub struct RateLimitCoordinator {
    cooldown_until: DashMap<String, Instant>,
    default_cooldown: Duration,
}

impl RateLimitCoordinator {
    pub fn new(default_cooldown: Duration) -> Self {
        Self {
            cooldown_until: DashMap::new(),
            default_cooldown,
        }
    }

    /// True when `provider` may issue upstream calls right now.
    pub fn is_eligible(&self, provider: &str) -> bool {
        match self.cooldown_until.get(provider) {
            Some(until) => Instant::now() >= *until,
            None => true,
        }
    }

    /// Time left in the provider's cooldown window, if one is active.
    pub fn cooldown_remaining(&self, provider: &str) -> Option<Duration> {
        let until = *self.cooldown_until.get(provider)?;
        until.checked_duration_since(Instant::now())
    }

    /// Record a throttling signal. Uses the server-suggested window when one
    /// was given, the configured default otherwise. Last write wins: a later
    /// signal may shorten or lengthen the window.
    pub fn mark_throttled(&self, provider: &str, suggested: Option<Duration>) -> Duration {
        let window = suggested.unwrap_or(self.default_cooldown);
        self.cooldown_until
            .insert(provider.to_string(), Instant::now() + window);
        warn!(
            provider,
            cooldown_secs = window.as_secs(),
            "provider throttled, entering cooldown"
        );
        window
    }
}
