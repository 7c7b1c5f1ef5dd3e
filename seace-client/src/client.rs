//! Cached, typed facade over the backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{Map, Value};

use seace_cache::{
    CacheConfig, CacheKey, CacheRead, FetchOptions, JsonFileStore, LmdbStore, PersistentStore,
    ResponseCache,
};
use seace_core::{
    CacheSettings, Document, EntitySummary, InterestStatus, PersistMode, Priority,
    RegionSummary, ScheduleEntry, SeaceConfig, SeaceError, Statistics, TrackedTender,
};

use crate::actions::Action;
use crate::adapter::{self, TenderPage};
use crate::error::FetchError;
use crate::invalidation::Invalidator;
use crate::keys::{self, TenderFilters};
use crate::rest::{encode_payload, Backend, Params, RestClient};

const DEFAULT_LMDB_DIR: &str = ".seace-cache";
const DEFAULT_JSON_FILE: &str = ".seace-cache.json";

/// Fields of a tracked tender to change. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingUpdate {
    pub status: Option<InterestStatus>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

/// Backend client whose reads go through the response cache.
///
/// Cloning shares the backend and the cache.
pub struct SeaceClient<B = RestClient> {
    backend: Arc<B>,
    cache: ResponseCache<FetchError>,
    invalidator: Invalidator,
    options: FetchOptions,
}

impl<B> Clone for SeaceClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
            invalidator: self.invalidator.clone(),
            options: self.options,
        }
    }
}

impl SeaceClient<RestClient> {
    /// HTTP client plus a cache built from `config.cache`.
    /// Validate `config`, then build the HTTP backend and the cache it
    /// describes.
    pub fn from_config(config: &SeaceConfig) -> Result<Self, FetchError> {
        config.validate().map_err(SeaceError::from)?;
        let backend = RestClient::new(&config.api)?;
        Ok(Self::new(backend, cache_from_settings(&config.cache)))
    }
}

/// Build the response cache described by `settings`.
///
/// A persistent tier that cannot be opened is logged and skipped; the cache
/// then runs memory-only.
pub fn cache_from_settings(settings: &CacheSettings) -> ResponseCache<FetchError> {
    let config = CacheConfig::default().with_default_ttl(Duration::from_millis(settings.default_ttl_ms));

    let store: Option<Arc<dyn PersistentStore>> = match settings.persist {
        PersistMode::None => None,
        PersistMode::Json => {
            let path = settings
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_JSON_FILE));
            tracing::info!(path = %path.display(), "using JSON cache file");
            Some(Arc::new(JsonFileStore::new(path)))
        }
        PersistMode::Lmdb => {
            let path = settings
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LMDB_DIR));
            let max_size_mb = usize::try_from(settings.max_size_mb).unwrap_or(usize::MAX);
            match LmdbStore::open(&path, max_size_mb) {
                Ok(store) => {
                    tracing::info!(path = %path.display(), max_size_mb, "using LMDB cache");
                    Some(Arc::new(store))
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to open LMDB cache, continuing memory-only"
                    );
                    None
                }
            }
        }
    };

    match store {
        Some(store) => ResponseCache::with_store(config, store),
        None => ResponseCache::new(config),
    }
}

impl<B: Backend + 'static> SeaceClient<B> {
    pub fn new(backend: B, cache: ResponseCache<FetchError>) -> Self {
        let invalidator = Invalidator::new(cache.clone());
        Self {
            backend: Arc::new(backend),
            cache,
            invalidator,
            options: FetchOptions::default(),
        }
    }

    /// Options applied to every read, e.g. [`FetchOptions::force_refresh`].
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &ResponseCache<FetchError> {
        &self.cache
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Cached read of the raw response for `key`. The key's params are the
    /// request's query params.
    pub async fn read(&self, key: &CacheKey) -> Result<CacheRead<Value>, FetchError> {
        let backend = Arc::clone(&self.backend);
        let action = key.action().to_string();
        let params: Params = key
            .params()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        self.cache
            .get_or_fetch_with(key, self.options, move || backend.call(&action, params))
            .await
    }

    async fn read_as<T>(
        &self,
        key: &CacheKey,
        decode: fn(&Value) -> Result<T, seace_core::ValidationError>,
    ) -> Result<CacheRead<T>, FetchError> {
        self.read(key).await?.try_map(|value| {
            decode(&value).map_err(|e| {
                tracing::warn!(action = key.action(), error = %e, "response could not be normalized");
                FetchError::from(e)
            })
        })
    }

    pub async fn get_procesos(&self, filters: &TenderFilters) -> Result<CacheRead<TenderPage>, FetchError> {
        self.read_as(&keys::procesos(filters), adapter::tenders_from_response)
            .await
    }

    pub async fn get_estadisticas(&self) -> Result<CacheRead<Statistics>, FetchError> {
        self.read_as(&keys::estadisticas(), adapter::statistics_from_response)
            .await
    }

    pub async fn get_regiones(&self) -> Result<CacheRead<Vec<RegionSummary>>, FetchError> {
        self.read_as(&keys::regiones(), adapter::regions_from_response)
            .await
    }

    pub async fn get_entidades_unicas(&self) -> Result<CacheRead<Vec<EntitySummary>>, FetchError> {
        self.read_as(&keys::entidades_unicas(), adapter::entities_from_response)
            .await
    }

    pub async fn get_seguimiento(&self) -> Result<CacheRead<Vec<TrackedTender>>, FetchError> {
        self.read_as(&keys::seguimiento(), adapter::tracked_from_response)
            .await
    }

    pub async fn get_cronograma(&self, nomenclature: &str) -> Result<CacheRead<Vec<ScheduleEntry>>, FetchError> {
        self.read_as(&keys::cronograma(nomenclature), adapter::schedule_from_response)
            .await
    }

    /// Documents of one tender, or of every tender when `nomenclature` is
    /// `None`.
    pub async fn get_documentos(
        &self,
        nomenclature: Option<&str>,
    ) -> Result<CacheRead<Vec<Document>>, FetchError> {
        self.read_as(&keys::documentos(nomenclature), adapter::documents_from_response)
            .await
    }

    /// Start following a tender.
    pub async fn add_seguimiento(&self, tracked: &TrackedTender) -> Result<Value, FetchError> {
        let mut payload = Map::new();
        payload.insert("nomenclatura".into(), tracked.nomenclature.trim().into());
        payload.insert("estado".into(), tracked.status.as_str().into());
        payload.insert("prioridad".into(), tracked.priority.as_str().into());
        payload.insert("notas".into(), tracked.notes.clone().into());
        self.write(Action::AddSeguimiento, &tracked.nomenclature, payload)
            .await
    }

    pub async fn update_seguimiento(
        &self,
        nomenclature: &str,
        update: &TrackingUpdate,
    ) -> Result<Value, FetchError> {
        let mut payload = Map::new();
        payload.insert("nomenclatura".into(), nomenclature.trim().into());
        payload.insert("estado".into(), update.status.map(|s| s.as_str()).into());
        payload.insert("prioridad".into(), update.priority.map(|p| p.as_str()).into());
        payload.insert("notas".into(), update.notes.clone().into());
        self.write(Action::UpdateSeguimiento, nomenclature, payload)
            .await
    }

    pub async fn delete_seguimiento(&self, nomenclature: &str) -> Result<Value, FetchError> {
        let mut payload = Map::new();
        payload.insert("nomenclatura".into(), nomenclature.trim().into());
        self.write(Action::DeleteSeguimiento, nomenclature, payload)
            .await
    }

    /// Run a tracking write, then drop the reads it made stale. A failed
    /// write invalidates nothing.
    async fn write(
        &self,
        action: Action,
        nomenclature: &str,
        payload: Map<String, Value>,
    ) -> Result<Value, FetchError> {
        debug_assert!(action.is_write());
        let response = self
            .backend
            .call(action.as_str(), encode_payload(&payload))
            .await?;

        self.invalidator.on_tracking_change();
        self.invalidator.on_tender_change(nomenclature);
        tracing::info!(%action, nomenclature, "tracking updated");
        Ok(response)
    }

    /// Warm the dashboard reads that are not cached yet, concurrently.
    /// Failures are logged; preload never fails.
    pub async fn preload(&self) {
        let targets = [
            keys::procesos(&TenderFilters::default()),
            keys::estadisticas(),
            keys::seguimiento(),
        ];
        let pending: Vec<&CacheKey> = targets
            .iter()
            .filter(|key| self.cache.peek(key).is_none())
            .collect();
        if pending.is_empty() {
            tracing::debug!("preload skipped, dashboard reads cached");
            return;
        }

        join_all(pending.iter().map(|key| async move {
            if let Err(e) = self.read(key).await {
                tracing::warn!(action = key.action(), error = %e, "preload failed");
            }
        }))
        .await;
        tracing::debug!(warmed = pending.len(), "preload finished");
    }
}
