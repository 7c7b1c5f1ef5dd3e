//! Stored cache entries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub cached_at: DateTime<Utc>,
    pub ttl_ms: u64,
    /// Owning action tag.
    pub action: String,
}

impl CacheEntry {
    pub fn new(action: impl Into<String>, value: Value, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            action: action.into(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Age of the entry at `now`. Entries stamped in the future have age zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// An entry expires once its age strictly exceeds its TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl()
    }

    /// Approximate serialized size in bytes.
    pub fn size_bytes(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}
