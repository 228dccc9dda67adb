//! Caching layers.
//!
//! Three granularities with different lifetimes: full candidate sets
//! (in-memory, hours), resolved download links (in-memory, minutes), and
//! availability summaries (durable, days).

pub mod availability;
pub mod ttl;

pub use availability::{spawn_flush_task, AvailabilityCache, AvailabilityEntry};
pub use ttl::TtlCache;
