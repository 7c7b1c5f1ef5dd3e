//! Cache invalidation after writes.
//!
//! Each rule names the reads whose answers a kind of change makes stale.
//! Rules by action drop every entry of that action, whatever its params;
//! per-tender rules drop only the keys for that nomenclature.

use seace_cache::ResponseCache;

use crate::actions::Action;
use crate::error::FetchError;
use crate::keys;

pub const TRACKING_READS: &[Action] = &[Action::GetSeguimiento, Action::GetSeguimientoDetalle];

pub const TENDER_SET_READS: &[Action] = &[
    Action::GetProcesos,
    Action::GetEstadisticas,
    Action::GetRegiones,
];

pub const FILTER_READS: &[Action] = &[Action::GetFiltrosEntidades, Action::GetFiltrosPalabras];

/// Invalidation rules bound to one cache.
#[derive(Clone)]
pub struct Invalidator {
    cache: ResponseCache<FetchError>,
}

impl Invalidator {
    pub fn new(cache: ResponseCache<FetchError>) -> Self {
        Self { cache }
    }

    fn invalidate_actions(&self, reason: &'static str, actions: &[Action]) -> usize {
        let removed = actions
            .iter()
            .map(|action| self.cache.invalidate(action.as_str()))
            .sum();
        tracing::debug!(reason, removed, "cache invalidation");
        removed
    }

    /// A tracked tender was added, updated or removed.
    pub fn on_tracking_change(&self) -> usize {
        self.invalidate_actions("tracking", TRACKING_READS)
    }

    /// The tender set changed (new import, scrape, deletion).
    pub fn on_tenders_change(&self) -> usize {
        self.invalidate_actions("tenders", TENDER_SET_READS)
    }

    pub fn on_filters_change(&self) -> usize {
        self.invalidate_actions("filters", FILTER_READS)
    }

    /// One tender changed: drop every per-tender read for `nomenclature`.
    pub fn on_tender_change(&self, nomenclature: &str) -> usize {
        let keys = [
            keys::cronograma(nomenclature),
            keys::documentos(Some(nomenclature)),
            keys::datos_seace(nomenclature),
            keys::proceso_ocds(nomenclature),
            keys::seguimiento_detalle(nomenclature),
            keys::grupo_by_nomenclatura(nomenclature),
        ];
        let removed = keys
            .iter()
            .filter(|key| self.cache.invalidate_key(key))
            .count();
        tracing::debug!(nomenclature, removed, "tender cache invalidated");
        removed
    }

    pub fn clear_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seace_cache::{CacheConfig, CacheKey};
    use serde_json::{json, Value};
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    async fn ok(value: Value) -> Result<Value, FetchError> {
        Ok(value)
    }

    async fn fill(cache: &ResponseCache<FetchError>, key: CacheKey) {
        cache.get_or_fetch(&key, TTL, || ok(json!([]))).await.unwrap();
    }

    #[tokio::test]
    async fn test_tracking_change() {
        let cache = ResponseCache::new(CacheConfig::default());
        fill(&cache, keys::seguimiento()).await;
        fill(&cache, keys::seguimiento_detalle("A")).await;
        fill(&cache, keys::seguimiento_detalle("B")).await;
        fill(&cache, keys::estadisticas()).await;

        let invalidator = Invalidator::new(cache.clone());
        assert_eq!(invalidator.on_tracking_change(), 3);
        assert!(cache.peek(&keys::estadisticas()).is_some());
        assert!(cache.peek(&keys::seguimiento()).is_none());
    }

    #[tokio::test]
    async fn test_tenders_change_drops_every_filter_combination() {
        let cache = ResponseCache::new(CacheConfig::default());
        fill(&cache, keys::procesos(&Default::default())).await;
        fill(&cache, keys::procesos(&keys::TenderFilters::default().region("LIMA"))).await;
        fill(&cache, keys::regiones()).await;
        fill(&cache, keys::seguimiento()).await;

        let invalidator = Invalidator::new(cache.clone());
        assert_eq!(invalidator.on_tenders_change(), 3);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn test_tender_change_is_scoped_to_one_code() {
        let cache = ResponseCache::new(CacheConfig::default());
        fill(&cache, keys::cronograma("A")).await;
        fill(&cache, keys::documentos(Some("A"))).await;
        fill(&cache, keys::cronograma("B")).await;
        fill(&cache, keys::documentos(None)).await;

        let invalidator = Invalidator::new(cache.clone());
        assert_eq!(invalidator.on_tender_change("A"), 2);
        assert!(cache.peek(&keys::cronograma("B")).is_some());
        assert!(cache.peek(&keys::documentos(None)).is_some());
    }

    #[tokio::test]
    async fn test_filters_change_and_clear() {
        let cache = ResponseCache::new(CacheConfig::default());
        fill(&cache, keys::filtros_entidades()).await;
        fill(&cache, keys::filtros_palabras()).await;
        fill(&cache, keys::regiones()).await;

        let invalidator = Invalidator::new(cache.clone());
        assert_eq!(invalidator.on_filters_change(), 2);
        invalidator.clear_all();
        assert_eq!(cache.stats().entries, 0);
    }
}
