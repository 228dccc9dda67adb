//! Lazy download-link resolution.
//!
//! Providers whose search results are indirections need a second upstream
//! round-trip to mint a retrievable URL. [`Resolver`] fronts that call with
//! a short-TTL cache and a single-flight registry: for any resource id, at
//! most one upstream resolution is in flight at a time, and concurrent
//! callers share its outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::providers::SubtitleProvider;
use crate::cache::TtlCache;

type PendingResult = ProviderResult<String>;

pub struct Resolver {
    /// Providers that declared the resolution capability, by name.
    providers: HashMap<&'static str, Arc<dyn SubtitleProvider>>,
    cache: TtlCache<String, String>,
    /// At most one entry per resource id; holding an entry means an upstream
    /// call is in flight and later callers subscribe instead of dialing out.
    pending: Mutex<HashMap<String, broadcast::Sender<PendingResult>>>,
}

impl Resolver {
    pub fn new(providers: &[Arc<dyn SubtitleProvider>], link_ttl: Duration) -> Self {
        let providers = providers
            .iter()
            .filter(|p| p.supports_resolution())
            .map(|p| (p.name(), Arc::clone(p)))
            .collect();
        Self {
            providers,
            cache: TtlCache::new(link_ttl),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Whether download locators from `provider` go through this resolver.
    pub fn handles(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    /// Resolve `file_id` at `provider` into a retrievable URL.
    ///
    /// Cache hit: returned immediately, no upstream call. Otherwise exactly
    /// one caller performs the upstream call per resource id; everyone else
    /// awaits the shared outcome. The pending entry is cleared on success
    /// and failure alike so later callers can retry after a failure.
    pub async fn resolve(&self, provider: &str, file_id: &str) -> ProviderResult<String> {
        let key = format!("{provider}:{file_id}");

        if let Some(url) = self.cache.get(&key) {
            debug!(key = %key, "resolution cache hit");
            return Ok(url);
        }

        let provider = self
            .providers
            .get(provider)
            .cloned()
            .ok_or(ProviderError::NotFound)?;

        let mut receiver = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    pending.insert(key.clone(), sender);
                    None
                }
            }
        };

        if let Some(receiver) = receiver.as_mut() {
            debug!(key = %key, "joining in-flight resolution");
            return match receiver.recv().await {
                Ok(shared) => shared,
                // The resolving task died without reporting; let the caller
                // see it as a transient failure and retry.
                Err(_) => Err(ProviderError::Unavailable(
                    "in-flight resolution was abandoned".to_string(),
                )),
            };
        }

        let result = provider.resolve_download(file_id).await;

        if let Ok(url) = &result {
            self.cache.insert(key.clone(), url.clone());
        }

        // Remove the pending entry before publishing, so a caller that
        // arrives after this point starts a fresh attempt (or hits the
        // cache) instead of waiting on a closed channel.
        let sender = self.pending.lock().remove(&key);
        if let Some(sender) = sender {
            let _ = sender.send(result.clone());
        }

        result
    }

    pub fn cached_links(&self) -> usize {
        self.cache.len()
    }

    /// Active eviction pass over the link cache; returns entries removed.
    pub fn sweep_expired(&self) -> usize {
        self.cache.sweep()
    }
}
