//! Tracking, schedule, document and dashboard summary records.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::text::normalize_label;

/// Interest status of a tracked tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestStatus {
    #[default]
    Pendiente,
    Inscrito,
    Descartado,
}

impl InterestStatus {
    /// Lenient parse; unknown or blank labels fall back to `Pendiente`.
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "INSCRITO" => InterestStatus::Inscrito,
            "DESCARTADO" => InterestStatus::Descartado,
            _ => InterestStatus::Pendiente,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterestStatus::Pendiente => "PENDIENTE",
            InterestStatus::Inscrito => "INSCRITO",
            InterestStatus::Descartado => "DESCARTADO",
        }
    }
}

/// Priority assigned to a tracked tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Alta,
    #[default]
    Media,
    Baja,
}

impl Priority {
    /// Lenient parse; unknown or blank labels fall back to `Media`.
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "ALTA" => Priority::Alta,
            "BAJA" => Priority::Baja,
            _ => Priority::Media,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Alta => "ALTA",
            Priority::Media => "MEDIA",
            Priority::Baja => "BAJA",
        }
    }
}

/// Status of one schedule phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    EnPlazo,
    Vencido,
    #[default]
    Pendiente,
}

impl PhaseStatus {
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).replace(' ', "_").as_str() {
            "EN_PLAZO" => PhaseStatus::EnPlazo,
            "VENCIDO" => PhaseStatus::Vencido,
            _ => PhaseStatus::Pendiente,
        }
    }
}

/// A tender the user follows, with their own annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTender {
    pub nomenclature: String,
    pub status: InterestStatus,
    pub priority: Priority,
    pub notes: String,
    pub added_on: Option<NaiveDate>,
    pub drive_folder: Option<String>,
    pub entity: Option<String>,
    pub value: Option<f64>,
    pub object: Option<String>,
    pub deadline: Option<NaiveDate>,
}

impl TrackedTender {
    pub fn new(nomenclature: impl Into<String>) -> Self {
        Self {
            nomenclature: nomenclature.into(),
            status: InterestStatus::default(),
            priority: Priority::default(),
            notes: String::new(),
            added_on: None,
            drive_folder: None,
            entity: None,
            value: None,
            object: None,
            deadline: None,
        }
    }
}

/// One phase of a tender's schedule (cronograma).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub nomenclature: String,
    pub phase: String,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub status: PhaseStatus,
}

/// A document attached to a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<i64>,
    pub nomenclature: String,
    pub stage: String,
    pub kind: String,
    pub name: String,
    pub url: String,
    pub drive_url: Option<String>,
    pub uploaded_on: Option<NaiveDate>,
    pub notes: String,
}

/// Dashboard aggregate returned by `getEstadisticas`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub total_procesos: u64,
    pub por_region: BTreeMap<String, u64>,
    pub por_objeto: BTreeMap<String, u64>,
    pub por_entidad: BTreeMap<String, u64>,
    pub valor_total: f64,
    pub top_entidades: Vec<(String, u64)>,
}

/// One row of `getEntidadesUnicas`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySummary {
    #[serde(rename = "entidad")]
    pub entity: String,
    pub count: u64,
    #[serde(rename = "valor")]
    pub value: f64,
    #[serde(rename = "regiones")]
    pub regions: Vec<String>,
}

/// Tender count and total value for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub count: u64,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_status_lenient_parse() {
        assert_eq!(InterestStatus::from_label("inscrito"), InterestStatus::Inscrito);
        assert_eq!(InterestStatus::from_label("DESCARTADO"), InterestStatus::Descartado);
        assert_eq!(InterestStatus::from_label(""), InterestStatus::Pendiente);
        assert_eq!(InterestStatus::Inscrito.as_str(), "INSCRITO");
    }

    #[test]
    fn test_priority_defaults_to_media() {
        assert_eq!(Priority::from_label("alta"), Priority::Alta);
        assert_eq!(Priority::from_label("urgente"), Priority::Media);
        assert_eq!(Priority::default().as_str(), "MEDIA");
    }

    #[test]
    fn test_phase_status_accepts_spaced_label() {
        assert_eq!(PhaseStatus::from_label("En plazo"), PhaseStatus::EnPlazo);
        assert_eq!(PhaseStatus::from_label("EN_PLAZO"), PhaseStatus::EnPlazo);
        assert_eq!(PhaseStatus::from_label("VENCIDO"), PhaseStatus::Vencido);
        assert_eq!(PhaseStatus::from_label("???"), PhaseStatus::Pendiente);
    }

    #[test]
    fn test_statistics_deserializes_backend_shape() {
        let json = serde_json::json!({
            "totalProcesos": 3,
            "porRegion": { "LA LIBERTAD": 2, "AREQUIPA": 1 },
            "valorTotal": 1500.5,
            "topEntidades": [["HIDRANDINA", 2]]
        });
        let stats: Statistics = serde_json::from_value(json).unwrap();
        assert_eq!(stats.total_procesos, 3);
        assert_eq!(stats.por_region.get("LA LIBERTAD"), Some(&2));
        assert!(stats.por_objeto.is_empty());
        assert_eq!(stats.top_entidades, vec![("HIDRANDINA".to_string(), 2)]);
    }

    #[test]
    fn test_entity_summary_deserializes_spanish_keys() {
        let json = serde_json::json!({
            "entidad": "SEAL",
            "count": 4,
            "valor": 10.0,
            "regiones": ["AREQUIPA"]
        });
        let summary: EntitySummary = serde_json::from_value(json).unwrap();
        assert_eq!(summary.entity, "SEAL");
        assert_eq!(summary.regions, vec!["AREQUIPA".to_string()]);
    }
}
