//! LMDB-backed persistent tier.
//!
//! Uses the heed crate (Rust bindings for LMDB). Keys are the prefixed
//! encoded cache keys; values are JSON-serialized [`CacheEntry`] records.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::{storage_key, PersistentStore, StoreError, STORAGE_PREFIX};
use crate::entry::CacheEntry;

/// LMDB persistent tier.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(LmdbStore::open("/var/cache/seace", 64)?);
/// let cache = ResponseCache::with_store(CacheConfig::default(), store);
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open (or create) an LMDB environment in `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StoreError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            StoreError::EnvOpen(format!("map size of {} MB does not fit in memory", max_size_mb))
        })?;
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| StoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| StoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    /// Collect every key carrying the storage prefix, with its raw value.
    fn collect_prefixed(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let prefix = STORAGE_PREFIX.as_bytes();
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        let mut rows = Vec::new();
        for result in iter {
            let (key, value) = result.map_err(|e| StoreError::Transaction(e.to_string()))?;
            if key.starts_with(prefix) {
                rows.push((key.to_vec(), value.to_vec()));
            }
        }
        Ok(rows)
    }

    fn delete_keys(&self, keys: &[Vec<u8>]) -> Result<u64, StoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        let mut deleted = 0u64;
        for key in keys {
            let existed = self
                .db
                .delete(&mut wtxn, key)
                .map_err(|e| StoreError::Transaction(e.to_string()))?;
            if existed {
                deleted += 1;
            }
        }

        wtxn.commit()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(deleted)
    }
}

impl PersistentStore for LmdbStore {
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>, StoreError> {
        let prefix_len = STORAGE_PREFIX.len();
        let mut entries = Vec::new();
        let mut corrupt = Vec::new();

        for (raw_key, raw_value) in self.collect_prefixed()? {
            let key = String::from_utf8(raw_key[prefix_len..].to_vec());
            let entry = serde_json::from_slice::<CacheEntry>(&raw_value);
            match (key, entry) {
                (Ok(key), Ok(entry)) => entries.push((key, entry)),
                _ => corrupt.push(raw_key),
            }
        }

        if !corrupt.is_empty() {
            tracing::warn!(count = corrupt.len(), "dropping undecodable persisted cache entries");
            self.delete_keys(&corrupt)?;
        }
        Ok(entries)
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        let value =
            serde_json::to_vec(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, storage_key(key).as_bytes(), &value)
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.delete_keys(&[storage_key(key).into_bytes()])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let keys: Vec<Vec<u8>> = self
            .collect_prefixed()?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        self.delete_keys(&keys)?;
        Ok(())
    }
}
