//! Persistent tiers.
//!
//! The in-memory map is authoritative; a persistent tier only mirrors it so
//! entries survive a restart. Every tier failure is reported as a
//! [`StoreError`] and the cache logs and swallows it.

pub mod json_file;
pub mod lmdb;

pub use json_file::JsonFileStore;
pub use lmdb::LmdbStore;

use crate::entry::CacheEntry;

/// Prefix applied to every key a tier writes, so a shared store can be
/// cleared without touching foreign keys.
pub const STORAGE_PREFIX: &str = "seace_cache_";

/// Error type for persistent tier operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A best-effort mirror of the cache's entries.
///
/// Keys passed in are encoded cache keys without the storage prefix;
/// implementations add and strip it themselves.
pub trait PersistentStore: Send + Sync {
    /// Every stored entry, including expired ones. Entries that cannot be
    /// decoded are dropped from the tier and skipped.
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>, StoreError>;

    /// Insert or overwrite one entry.
    fn save(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Remove one entry. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every entry this tier owns.
    fn clear(&self) -> Result<(), StoreError>;
}

fn storage_key(key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, key)
}
