//! Cache usage statistics.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live entries currently held in memory.
    pub entries: usize,
    /// Distinct action tags among those entries, sorted.
    pub actions: Vec<String>,
    /// Approximate serialized size of all entries.
    pub size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Size in kilobytes, for display.
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}
