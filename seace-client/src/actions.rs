//! Backend action names.

use std::fmt;

/// Actions understood by the Apps Script endpoint.
///
/// Only the reads and writes this client issues are listed, plus the reads
/// other front ends cache and that tracking writes must invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GetProcesos,
    GetEstadisticas,
    GetRegiones,
    GetEntidadesUnicas,
    GetSeguimiento,
    GetSeguimientoDetalle,
    GetCronograma,
    GetDocumentos,
    GetDatosSeace,
    GetProcesoOcds,
    GetGrupoByNomenclatura,
    GetFiltrosEntidades,
    GetFiltrosPalabras,
    AddSeguimiento,
    UpdateSeguimiento,
    DeleteSeguimiento,
}

impl Action {
    /// Wire name, as sent in the `action` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetProcesos => "getProcesos",
            Action::GetEstadisticas => "getEstadisticas",
            Action::GetRegiones => "getRegiones",
            Action::GetEntidadesUnicas => "getEntidadesUnicas",
            Action::GetSeguimiento => "getSeguimiento",
            Action::GetSeguimientoDetalle => "getSeguimientoDetalle",
            Action::GetCronograma => "getCronograma",
            Action::GetDocumentos => "getDocumentos",
            Action::GetDatosSeace => "getDatosSeace",
            Action::GetProcesoOcds => "getProcesoOCDS",
            Action::GetGrupoByNomenclatura => "getGrupoByNomenclatura",
            Action::GetFiltrosEntidades => "getFiltrosEntidades",
            Action::GetFiltrosPalabras => "getFiltrosPalabras",
            Action::AddSeguimiento => "addSeguimiento",
            Action::UpdateSeguimiento => "updateSeguimiento",
            Action::DeleteSeguimiento => "deleteSeguimiento",
        }
    }

    /// Writes are never cached.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Action::AddSeguimiento | Action::UpdateSeguimiento | Action::DeleteSeguimiento
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(Action::GetProcesoOcds.as_str(), "getProcesoOCDS");
        assert_eq!(Action::GetRegiones.to_string(), "getRegiones");
    }

    #[test]
    fn test_writes() {
        assert!(Action::DeleteSeguimiento.is_write());
        assert!(!Action::GetSeguimiento.is_write());
    }
}
