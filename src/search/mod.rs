//! Aggregation engine.
//!
//! [`SearchEngine`] owns the provider registry and the result/availability
//! caches, fans each uncached lookup out across all providers concurrently,
//! merges and deduplicates their candidates, and optionally ranks them
//! against the caller's target descriptor.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{AvailabilityCache, AvailabilityEntry, TtlCache};
use crate::model::{Candidate, ContentIdentity, RankedCandidate, TargetDescriptor};
use crate::providers::SubtitleProvider;
use crate::release;

pub mod resolve;

pub use resolve::Resolver;

/// Tunables for the engine, lifted from the `[search]` and `[cache]` config
/// tables. The caps are configuration constants, never computed.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How long a merged candidate set stays valid.
    pub results_ttl: Duration,
    /// Bounded wait for each individual provider call.
    pub provider_timeout: Duration,
    /// Upper bound on the merged candidate set.
    pub max_results: usize,
    /// Per-provider contribution cap, set in reduced-footprint mode.
    pub per_provider_cap: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            results_ttl: Duration::from_secs(4 * 3600),
            provider_timeout: Duration::from_secs(8),
            max_results: 15,
            per_provider_cap: None,
        }
    }
}

/// Counters surfaced in the health payload.
#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub result_cache_hits: u64,
    pub result_cache_misses: u64,
    pub cached_result_sets: usize,
    pub availability_entries: usize,
}

pub struct SearchEngine {
    providers: Vec<Arc<dyn SubtitleProvider>>,
    results: TtlCache<String, Vec<Candidate>>,
    availability: Arc<AvailabilityCache>,
    options: EngineOptions,
}

impl SearchEngine {
    /// Build the engine over the configured providers.
    ///
    /// An empty provider list is the one fatal precondition of the whole
    /// service; it is rejected here, once, at startup.
    pub fn new(
        providers: Vec<Arc<dyn SubtitleProvider>>,
        availability: Arc<AvailabilityCache>,
        options: EngineOptions,
    ) -> Result<Self> {
        anyhow::ensure!(!providers.is_empty(), "no subtitle providers configured");
        Ok(Self {
            providers,
            results: TtlCache::new(options.results_ttl),
            availability,
            options,
        })
    }

    /// Search for subtitle candidates, ranked when a target filename is
    /// present.
    ///
    /// The cache key is derived from the identity alone, so requests with
    /// different target descriptors share one cached candidate set; ranking
    /// runs per request on top of it.
    pub async fn search(
        &self,
        identity: &ContentIdentity,
        target: Option<&TargetDescriptor>,
    ) -> Vec<RankedCandidate> {
        let key = identity.cache_key();

        let candidates = match self.results.get(&key) {
            Some(cached) => {
                debug!(key = %key, candidates = cached.len(), "search result cache hit");
                cached
            }
            None => {
                let merged = self.fan_out(identity, target).await;
                // Empty sets are cached too: content genuinely lacking
                // matches must not trigger a fresh fan-out on every lookup.
                self.results.insert(key.clone(), merged.clone());
                self.availability
                    .record(&key, !merged.is_empty(), merged.len() as u32);
                merged
            }
        };

        rank(candidates, target)
    }

    /// Durable availability summary for an identity, if one is on record.
    pub fn availability(&self, identity: &ContentIdentity) -> Option<AvailabilityEntry> {
        self.availability.get(&identity.cache_key())
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            result_cache_hits: self.results.hits(),
            result_cache_misses: self.results.misses(),
            cached_result_sets: self.results.len(),
            availability_entries: self.availability.len(),
        }
    }

    /// Active eviction pass over the result cache; returns entries removed.
    pub fn sweep_expired(&self) -> usize {
        self.results.sweep()
    }

    /// Dispatch one unit of work per provider, all started together, each
    /// with its own timeout, and merge whatever came back.
    async fn fan_out(
        &self,
        identity: &ContentIdentity,
        target: Option<&TargetDescriptor>,
    ) -> Vec<Candidate> {
        let hash = target.and_then(|t| t.content_hash.clone());
        let byte_size = target.and_then(|t| t.byte_size);

        let calls = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let identity = identity.clone();
            let hash = hash.clone();
            let per_call_timeout = self.options.provider_timeout;
            async move { query_provider(provider, identity, hash, byte_size, per_call_timeout).await }
        });

        let per_provider = join_all(calls).await;
        self.merge(per_provider)
    }

    /// Merge per-provider lists in registration order, deduplicate by
    /// `(provider, locator)` preferring the hash-matched copy, and apply the
    /// configured caps before the set is cached.
    fn merge(&self, lists: Vec<Vec<Candidate>>) -> Vec<Candidate> {
        let mut merged: Vec<Candidate> = Vec::new();
        let mut seen: HashMap<(String, String), usize> = HashMap::new();

        for mut list in lists {
            if let Some(cap) = self.options.per_provider_cap {
                list.truncate(cap);
            }
            for candidate in list {
                let key = (
                    candidate.provider_id.clone(),
                    candidate.download_locator.clone(),
                );
                match seen.get(&key) {
                    Some(&idx) => {
                        if candidate.exact_hash_match && !merged[idx].exact_hash_match {
                            merged[idx] = candidate;
                        }
                    }
                    None => {
                        seen.insert(key, merged.len());
                        merged.push(candidate);
                    }
                }
            }
        }

        merged.truncate(self.options.max_results);
        merged
    }
}

/// One provider's failure-isolated unit of work: identity search, plus a
/// hash search when the target carries a hash and the provider supports it.
/// Every failure mode reduces to an empty contribution.
async fn query_provider(
    provider: Arc<dyn SubtitleProvider>,
    identity: ContentIdentity,
    hash: Option<String>,
    byte_size: Option<u64>,
    per_call_timeout: Duration,
) -> Vec<Candidate> {
    let name = provider.name();

    if !provider.is_available() {
        debug!(provider = name, "provider not configured, skipping");
        return Vec::new();
    }

    let mut candidates = match timeout(per_call_timeout, provider.search_by_identity(&identity)).await
    {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => {
            warn!(provider = name, "identity search failed: {e}");
            Vec::new()
        }
        Err(_) => {
            warn!(provider = name, "identity search timed out");
            Vec::new()
        }
    };

    if let Some(hash) = hash {
        if provider.supports_hash_search() {
            match timeout(per_call_timeout, provider.search_by_hash(&hash, byte_size)).await {
                Ok(Ok(found)) => candidates.extend(found),
                Ok(Err(e)) => warn!(provider = name, "hash search failed: {e}"),
                Err(_) => warn!(provider = name, "hash search timed out"),
            }
        }
    }

    candidates
}

/// Score and order candidates when the target supplies a filename; otherwise
/// pass the merged order through with no score at all. "No evidence" must
/// stay distinguishable from a score of zero.
fn rank(candidates: Vec<Candidate>, target: Option<&TargetDescriptor>) -> Vec<RankedCandidate> {
    let filename = target.and_then(|t| t.filename.as_deref());

    let Some(filename) = filename else {
        return candidates
            .into_iter()
            .map(|candidate| RankedCandidate {
                candidate,
                match_score: None,
            })
            .collect();
    };

    let parsed_target = release::parse(filename);

    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let parsed = release::parse(&candidate.release_label);
            let match_score = release::score(&parsed, &parsed_target, candidate.exact_hash_match);
            RankedCandidate {
                candidate,
                match_score: Some(match_score),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.match_score.cmp(&a.match_score).then_with(|| {
            b.candidate
                .popularity
                .partial_cmp(&a.candidate.popularity)
                .unwrap_or(Ordering::Equal)
        })
    });

    ranked
}
