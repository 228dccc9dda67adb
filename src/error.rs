//! Provider error taxonomy.
//!
//! Every upstream failure an adapter can encounter reduces to one of these
//! variants. On the search path the engine treats any of them as an empty
//! contribution from that provider; on the resolution path they propagate to
//! the caller so throttling can be surfaced with its retry hint.

use std::time::Duration;

/// Failure modes of a single provider call.
///
/// `Clone` so the single-flight registry can hand the same failure to every
/// coalesced waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// No response within the bounded wait for this call.
    #[error("provider request timed out")]
    Timeout,

    /// The provider answered with an explicit too-many-requests signal.
    #[error("throttled by provider")]
    Throttled {
        /// Server-suggested wait before retrying, when one was given.
        retry_after: Option<Duration>,
    },

    /// The provider answered but the payload could not be interpreted.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// Transport-level failure or an unexpected non-2xx status.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The requested resource does not exist upstream.
    #[error("resource not found")]
    NotFound,

    /// The provider does not implement the requested capability.
    #[error("capability not supported by this provider")]
    Unsupported,
}

impl ProviderError {
    /// Map a reqwest transport error onto the taxonomy.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }

    /// Suggested retry delay in whole seconds, for `Retry-After` headers.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ProviderError::Throttled { retry_after } => retry_after.map(|d| d.as_secs().max(1)),
            _ => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
