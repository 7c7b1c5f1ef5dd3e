//! JSON file persistent tier.
//!
//! The whole tier is one JSON object mapping prefixed keys to entries. Every
//! write rewrites the file through a temporary sibling and a rename, so a
//! crash leaves either the old or the new file on disk.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use super::{storage_key, PersistentStore, StoreError, STORAGE_PREFIX};
use crate::entry::CacheEntry;

pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use `path` as the backing file. The file and its parent directory are
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current map, and whether the file held something that is not a JSON
    /// object and must be overwritten. An undecodable file reads as empty.
    fn read_map(&self) -> Result<(BTreeMap<String, Value>, bool), StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((BTreeMap::new(), false)),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok((BTreeMap::new(), false));
        }
        match serde_json::from_str(&contents) {
            Ok(map) => Ok((map, false)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "persisted cache file is undecodable, starting it over"
                );
                Ok((BTreeMap::new(), true))
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes =
            serde_json::to_vec(map).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) -> Result<bool, StoreError>,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut map, reset) = self.read_map()?;
        if f(&mut map)? || reset {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

impl PersistentStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut map, reset) = self.read_map()?;

        let mut entries = Vec::new();
        let mut corrupt = Vec::new();
        for (raw_key, raw_value) in &map {
            let Some(key) = raw_key.strip_prefix(STORAGE_PREFIX) else {
                continue;
            };
            match serde_json::from_value::<CacheEntry>(raw_value.clone()) {
                Ok(entry) => entries.push((key.to_string(), entry)),
                Err(_) => corrupt.push(raw_key.clone()),
            }
        }

        if !corrupt.is_empty() {
            tracing::warn!(count = corrupt.len(), "dropping undecodable persisted cache entries");
            for key in &corrupt {
                map.remove(key);
            }
        }
        if reset || !corrupt.is_empty() {
            self.write_map(&map)?;
        }
        Ok(entries)
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.update(|map| {
            map.insert(storage_key(key), value);
            Ok(true)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|map| Ok(map.remove(&storage_key(key)).is_some()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.update(|map| {
            let before = map.len();
            map.retain(|k, _| !k.starts_with(STORAGE_PREFIX));
            Ok(map.len() != before)
        })
    }
}
