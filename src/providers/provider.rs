//! Capability trait implemented by every subtitle provider adapter.

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::model::{Candidate, ContentIdentity};

/// Async trait over the closed set of upstream subtitle sources.
///
/// Identity search is mandatory; content-hash search and download-locator
/// resolution are optional capabilities declared through explicit flags.
/// Callers check the flag rather than probing for runtime failures.
///
/// Adapters own their throttling discipline: each implementation consults
/// the shared [`RateLimitCoordinator`](super::RateLimitCoordinator) before
/// any upstream call and records cooldowns when the upstream pushes back.
/// Errors returned from search methods are reduced to an empty contribution
/// by the engine; only the resolution path propagates them.
#[async_trait]
pub trait SubtitleProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"opensubtitles"`).
    fn name(&self) -> &'static str;

    /// True when the provider is configured well enough to serve requests.
    fn is_available(&self) -> bool;

    /// Whether [`search_by_hash`](Self::search_by_hash) is implemented.
    fn supports_hash_search(&self) -> bool {
        false
    }

    /// Whether download locators from this provider need a second upstream
    /// round-trip through [`resolve_download`](Self::resolve_download) before
    /// they are retrievable.
    fn supports_resolution(&self) -> bool {
        false
    }

    /// Search by content identity. Required for all providers.
    async fn search_by_identity(&self, identity: &ContentIdentity)
        -> ProviderResult<Vec<Candidate>>;

    /// Search by content hash of the target file. Results are exact matches
    /// by definition; implementations must flag them accordingly.
    async fn search_by_hash(
        &self,
        _hash: &str,
        _byte_size: Option<u64>,
    ) -> ProviderResult<Vec<Candidate>> {
        Err(ProviderError::Unsupported)
    }

    /// Mint a retrievable URL for a previously returned locator.
    async fn resolve_download(&self, _file_id: &str) -> ProviderResult<String> {
        Err(ProviderError::Unsupported)
    }
}
