//! SEACE Cache - Response Cache for Backend Reads
//!
//! TTL memoization of backend responses keyed by action and parameters,
//! with in-flight de-duplication, per-action TTL policy, invalidation by
//! action tag or key, and an optional persistent tier (LMDB or a JSON file)
//! so entries survive a restart.

pub mod cache;
pub mod entry;
pub mod freshness;
pub mod key;
pub mod policy;
pub mod stats;
pub mod store;

pub use cache::ResponseCache;
pub use entry::CacheEntry;
pub use freshness::CacheRead;
pub use key::CacheKey;
pub use policy::{CacheConfig, FetchOptions, DEFAULT_ACTION_TTLS, DEFAULT_TTL};
pub use stats::CacheStats;

// Re-export persistent tiers for client and CLI wiring
pub use store::{JsonFileStore, LmdbStore, PersistentStore, StoreError, STORAGE_PREFIX};
