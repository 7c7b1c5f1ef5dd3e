//! TTL policy and fetch options.

use std::collections::HashMap;
use std::time::Duration;

/// TTL applied to actions without an entry in the per-action table.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Per-action TTLs for the SEACE backend actions.
pub const DEFAULT_ACTION_TTLS: &[(&str, Duration)] = &[
    // Reference data that rarely changes.
    ("getRegiones", Duration::from_secs(30 * 60)),
    ("getEntidadesUnicas", Duration::from_secs(30 * 60)),
    ("getFiltrosEntidades", Duration::from_secs(30 * 60)),
    ("getFiltrosPalabras", Duration::from_secs(30 * 60)),
    ("getEmpresasElectricas", Duration::from_secs(30 * 60)),
    ("getProcesos", Duration::from_secs(10 * 60)),
    ("getEstadisticas", Duration::from_secs(10 * 60)),
    ("getSeguimiento", Duration::from_secs(2 * 60)),
    ("getCronograma", Duration::from_secs(5 * 60)),
    ("getDocumentos", Duration::from_secs(5 * 60)),
    ("getDatosSeace", Duration::from_secs(5 * 60)),
    ("getProcesoOCDS", Duration::from_secs(5 * 60)),
    ("getGrupoByNomenclatura", Duration::from_secs(5 * 60)),
    ("getSeguimientoDetalle", Duration::from_secs(60)),
];

/// Configuration for the response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for actions not listed in `ttl_by_action`.
    pub default_ttl: Duration,
    /// Per-action TTL overrides.
    pub ttl_by_action: HashMap<String, Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            ttl_by_action: DEFAULT_ACTION_TTLS
                .iter()
                .map(|(action, ttl)| (action.to_string(), *ttl))
                .collect(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Override the TTL for one action.
    pub fn with_action_ttl(mut self, action: impl Into<String>, ttl: Duration) -> Self {
        self.ttl_by_action.insert(action.into(), ttl);
        self
    }

    /// TTL for `action`.
    pub fn ttl_for(&self, action: &str) -> Duration {
        self.ttl_by_action
            .get(action)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

/// Per-call options for a cached fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Ignore a live entry and fetch again. The result still joins any fetch
    /// already in flight and is stored.
    pub force_refresh: bool,
    /// Bypass the cache entirely: no read, no de-duplication, no store.
    pub skip_cache: bool,
    /// TTL for the stored entry; the policy TTL when absent.
    pub ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn force_refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    pub fn skip_cache() -> Self {
        Self {
            skip_cache: true,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}
