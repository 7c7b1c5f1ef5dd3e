//! Typed cache keys, one constructor per cacheable action.
//!
//! A key's parameters are exactly the query parameters of the request it
//! caches, so the key is also the request description.

use seace_cache::CacheKey;

use crate::actions::Action;

/// Filters accepted by `getProcesos`. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenderFilters {
    pub region: Option<String>,
    pub entity: Option<String>,
    pub object: Option<String>,
    pub search: Option<String>,
    pub keywords: Vec<String>,
}

impl TenderFilters {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        non_empty(&self.region).is_none()
            && non_empty(&self.entity).is_none()
            && non_empty(&self.object).is_none()
            && non_empty(&self.search).is_none()
            && self.keywords.iter().all(|k| k.trim().is_empty())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn key(action: Action) -> CacheKey {
    CacheKey::new(action.as_str())
}

fn with_nomenclature(action: Action, nomenclature: &str) -> CacheKey {
    key(action).with_param("nomenclatura", nomenclature.trim())
}

pub fn procesos(filters: &TenderFilters) -> CacheKey {
    let keywords: Vec<&str> = filters
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();

    key(Action::GetProcesos)
        .with_opt_param("region", non_empty(&filters.region))
        .with_opt_param("entidad", non_empty(&filters.entity))
        .with_opt_param("objeto", non_empty(&filters.object))
        .with_opt_param("busqueda", non_empty(&filters.search))
        .with_opt_param(
            "palabrasClave",
            (!keywords.is_empty()).then(|| keywords.join(",")),
        )
}

pub fn estadisticas() -> CacheKey {
    key(Action::GetEstadisticas)
}

pub fn regiones() -> CacheKey {
    key(Action::GetRegiones)
}

pub fn entidades_unicas() -> CacheKey {
    key(Action::GetEntidadesUnicas)
}

pub fn seguimiento() -> CacheKey {
    key(Action::GetSeguimiento)
}

pub fn seguimiento_detalle(nomenclature: &str) -> CacheKey {
    with_nomenclature(Action::GetSeguimientoDetalle, nomenclature)
}

pub fn cronograma(nomenclature: &str) -> CacheKey {
    with_nomenclature(Action::GetCronograma, nomenclature)
}

/// Documents for one tender, or every document when `nomenclature` is
/// `None`.
pub fn documentos(nomenclature: Option<&str>) -> CacheKey {
    key(Action::GetDocumentos).with_opt_param(
        "nomenclatura",
        nomenclature.map(str::trim).filter(|n| !n.is_empty()),
    )
}

pub fn datos_seace(nomenclature: &str) -> CacheKey {
    with_nomenclature(Action::GetDatosSeace, nomenclature)
}

pub fn proceso_ocds(nomenclature: &str) -> CacheKey {
    with_nomenclature(Action::GetProcesoOcds, nomenclature)
}

pub fn grupo_by_nomenclatura(nomenclature: &str) -> CacheKey {
    with_nomenclature(Action::GetGrupoByNomenclatura, nomenclature)
}

pub fn filtros_entidades() -> CacheKey {
    key(Action::GetFiltrosEntidades)
}

pub fn filtros_palabras() -> CacheKey {
    key(Action::GetFiltrosPalabras)
}
