//! Read results carrying hit/miss and age metadata.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a cache read.
///
/// Wraps the value with where it came from (cache or a fresh fetch) and when
/// it was cached, so callers can show data age.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from a live cache entry.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// A value that was just fetched from the backend.
    pub fn fetched(value: T) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// True if the data was cached at or after `timestamp`.
    pub fn is_fresh_as_of(&self, timestamp: DateTime<Utc>) -> bool {
        self.cached_at >= timestamp
    }

    /// Time elapsed since the value was cached.
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        }
    }

    /// Fallible map, for decoding a cached JSON value into a typed record.
    pub fn try_map<U, E, F>(self, f: F) -> Result<CacheRead<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(CacheRead {
            value: f(self.value)?,
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        })
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
