//! Durable availability cache.
//!
//! Long-TTL per-identity summary of whether any subtitles exist, persisted
//! to a flat JSON file so the answer survives process restarts. Only the
//! summary is durable; full candidate sets stay in the in-memory result
//! cache.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One availability summary. `count` is the number of candidates the last
/// full search produced; `available == false` with a valid entry means
/// "checked and empty", which is distinct from having no entry at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub available: bool,
    pub count: u32,
    pub checked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AvailabilityEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Restart-durable availability summaries keyed by content identity.
pub struct AvailabilityCache {
    entries: DashMap<String, AvailabilityEntry>,
    path: PathBuf,
    ttl: Duration,
    dirty: AtomicBool,
}

impl AvailabilityCache {
    /// Load the cache from `path`. A missing or unreadable backing file is
    /// not a startup failure: the cache simply starts empty. Entries that
    /// expired while the process was down are dropped during load.
    pub fn load(path: PathBuf, ttl: StdDuration) -> Arc<Self> {
        let cache = Arc::new(Self {
            entries: DashMap::new(),
            path,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(7)),
            dirty: AtomicBool::new(false),
        });

        match cache.read_backing_file() {
            Ok(Some(loaded)) => {
                let now = Utc::now();
                let mut kept = 0usize;
                for (key, entry) in loaded {
                    if !entry.is_expired(now) {
                        cache.entries.insert(key, entry);
                        kept += 1;
                    }
                }
                debug!(entries = kept, path = %cache.path.display(), "loaded availability cache");
            }
            Ok(None) => {
                debug!(path = %cache.path.display(), "no availability cache file, starting empty");
            }
            Err(e) => {
                warn!(path = %cache.path.display(), "availability cache unreadable, starting empty: {e:#}");
            }
        }

        cache
    }

    fn read_backing_file(&self) -> Result<Option<BTreeMap<String, AvailabilityEntry>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let loaded = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(loaded))
    }

    /// Look up the summary for `key`. Expired entries behave like a miss and
    /// are removed.
    pub fn get(&self, key: &str) -> Option<AvailabilityEntry> {
        let now = Utc::now();

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.clone());
            }
        }

        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            self.dirty.store(true, Ordering::Relaxed);
        }
        None
    }

    /// Record the outcome of a full search for `key`.
    pub fn record(&self, key: &str, available: bool, count: u32) {
        let now = Utc::now();
        self.entries.insert(
            key.to_string(),
            AvailabilityEntry {
                available,
                count,
                checked_at: now,
                expires_at: now + self.ttl,
            },
        );
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Drop the summary for a single identity.
    pub fn invalidate(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    /// Drop every summary.
    pub fn clear(&self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active eviction pass over expired entries.
    pub fn sweep(&self) {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        if self.entries.len() != before {
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    /// Rewrite the backing file if anything changed since the last flush.
    ///
    /// The snapshot is taken per-key without locking the whole map, so
    /// concurrent reads and writes proceed during a flush. A write failure
    /// leaves the cache serving from memory and re-arms the dirty flag so
    /// the next flush retries.
    pub fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(());
        }

        // BTreeMap keeps the file byte-stable for identical state.
        let snapshot: BTreeMap<String, AvailabilityEntry> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let result = serde_json::to_string_pretty(&snapshot)
            .context("failed to serialize availability cache")
            .and_then(|json| {
                std::fs::write(&self.path, json)
                    .with_context(|| format!("failed to write {}", self.path.display()))
            });

        if result.is_err() {
            self.dirty.store(true, Ordering::Relaxed);
        } else {
            debug!(entries = snapshot.len(), path = %self.path.display(), "flushed availability cache");
        }
        result
    }
}

/// Spawn the periodic sweep-and-flush loop. The task runs until aborted;
/// call [`AvailabilityCache::flush`] once more on shutdown for a final write.
pub fn spawn_flush_task(cache: Arc<AvailabilityCache>, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.sweep();
            if let Err(e) = cache.flush() {
                warn!("availability cache flush failed, will retry: {e:#}");
            }
        }
    })
}
