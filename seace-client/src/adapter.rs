//! Boundary normalization.
//!
//! The backend serves sheet rows whose column names, date formats and money
//! formats vary with the sheet they came from and the export that filled
//! it. Every accepted shape is mapped into the canonical types here, once;
//! nothing past this module sees a raw row.
//!
//! Rows that cannot be normalized are skipped and counted, never fatal to
//! the whole response.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use seace_core::{
    ContractObject, Currency, Document, EntitySummary, InterestStatus, PhaseStatus, Priority,
    RegionSummary, ScheduleEntry, Statistics, Tender, TrackedTender, ValidationError,
};

type Row = Map<String, Value>;

static DMY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("date pattern is valid")
});

static MONEY_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d.\-]").expect("money pattern is valid"));

// Column name variants, canonical sheet header first.
const ID: &[&str] = &["ID", "id", "Id"];
const NOMENCLATURE: &[&str] = &["NOMENCLATURA", "nomenclatura", "Nomenclatura"];
const ENTITY: &[&str] = &["ENTIDAD", "entidad", "Entidad", "Nombre o Sigla de la Entidad"];
const DESCRIPTION: &[&str] = &[
    "DESCRIPCION",
    "descripcion",
    "Descripción de Objeto",
    "Descripcion de Objeto",
];
const VALUE: &[&str] = &[
    "VALOR",
    "valor",
    "VR / VE / Cuantía de la contratación",
    "Valor Referencial",
];
const CURRENCY: &[&str] = &["MONEDA", "moneda", "Moneda"];
const PUBLISHED: &[&str] = &[
    "FECHA_PUB",
    "fechaPublicacion",
    "Fecha y Hora de Publicacion",
    "Fecha y Hora de Publicación",
];
const OBJECT: &[&str] = &["OBJETO", "objeto", "Objeto de Contratación"];
const REGION: &[&str] = &["REGION", "region", "Región"];
const VERSION: &[&str] = &["VERSION", "version", "Versión SEACE"];
const RESTARTED: &[&str] = &["REINICIADO", "reiniciadoDesde", "Reiniciado Desde"];
const URL: &[&str] = &["URL", "url"];

/// A normalized `getProcesos` response.
#[derive(Debug, Clone, PartialEq)]
pub struct TenderPage {
    /// Total reported by the backend, or the row count when absent.
    pub total: usize,
    pub tenders: Vec<Tender>,
    /// Rows dropped because they could not be normalized.
    pub skipped: usize,
}

// === Scalars ===

/// Parse a calendar date: `DD/MM/YYYY` with an optional time, `YYYY-MM-DD`,
/// or an ISO timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// Parse a date and time. Dates without a time read as midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = DMY_PATTERN.captures(raw) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, num(2)?, num(1)?)?;
        let time = match (num(4), num(5)) {
            (Some(h), Some(m)) => NaiveTime::from_hms_opt(h, m, num(6).unwrap_or(0))?,
            _ => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        return Some(date.and_time(time));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a money cell: a JSON number, or a string such as `"S/. 1,234.50"`.
/// Blank or unparseable cells are `None`.
pub fn parse_money(raw: &Value) -> Option<f64> {
    let amount = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-');
            let cleaned = MONEY_NOISE.replace_all(s, "");
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    amount.filter(|v| v.is_finite())
}

// === Field access ===

fn field<'a>(row: &'a Row, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| match row.get(*name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    })
}

fn text(row: &Row, names: &[&str]) -> Option<String> {
    field(row, names).map(|value| match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    })
}

fn text_or_empty(row: &Row, names: &[&str]) -> String {
    text(row, names).unwrap_or_default()
}

fn integer(row: &Row, names: &[&str]) -> Option<i64> {
    match field(row, names)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date(row: &Row, names: &[&str]) -> Option<NaiveDate> {
    text(row, names).and_then(|s| parse_date(&s))
}

fn datetime(row: &Row, names: &[&str]) -> Option<NaiveDateTime> {
    text(row, names).and_then(|s| parse_datetime(&s))
}

fn money(row: &Row, names: &[&str]) -> Option<f64> {
    field(row, names).and_then(parse_money)
}

fn required(row: &Row, names: &[&str]) -> Result<String, ValidationError> {
    text(row, names).ok_or_else(|| ValidationError::RequiredFieldMissing {
        field: names[0].to_string(),
    })
}

fn as_row(value: &Value) -> Result<&Row, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::InvalidValue {
        field: "row".to_string(),
        reason: "expected a JSON object".to_string(),
    })
}

/// The row array of a response: the body itself, or its `wrapper` member.
fn rows<'a>(value: &'a Value, wrapper: &str) -> Result<&'a [Value], ValidationError> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(obj) => match obj.get(wrapper) {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(ValidationError::InvalidValue {
                field: wrapper.to_string(),
                reason: "expected an array of rows".to_string(),
            }),
        },
        Value::Null => Ok(&[]),
        _ => Err(ValidationError::InvalidValue {
            field: wrapper.to_string(),
            reason: "expected an array or an object".to_string(),
        }),
    }
}

fn normalize_rows<T>(
    rows: &[Value],
    kind: &'static str,
    normalize: fn(&Value) -> Result<T, ValidationError>,
) -> (Vec<T>, usize) {
    let mut items = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in rows {
        match normalize(row) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                tracing::debug!(kind, error = %e, "skipping row");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(kind, skipped, kept = items.len(), "rows could not be normalized");
    }
    (items, skipped)
}

// === Records ===

pub fn tender_from_row(value: &Value) -> Result<Tender, ValidationError> {
    let row = as_row(value)?;
    let id = integer(row, ID).ok_or_else(|| ValidationError::RequiredFieldMissing {
        field: ID[0].to_string(),
    })?;
    let nomenclature = required(row, NOMENCLATURE)?;

    let mut tender = Tender::new(
        id,
        nomenclature,
        text_or_empty(row, ENTITY),
        text_or_empty(row, DESCRIPTION),
    );
    tender.value = money(row, VALUE);
    tender.currency = text(row, CURRENCY)
        .map(|c| Currency::from_label(&c))
        .unwrap_or_default();
    tender.published_on = date(row, PUBLISHED);
    tender.object = ContractObject::from_label(&text_or_empty(row, OBJECT));
    tender.region = text_or_empty(row, REGION);
    tender.version = integer(row, VERSION).and_then(|v| u32::try_from(v).ok());
    tender.restarted_from = text(row, RESTARTED);
    tender.url = text(row, URL);
    tender.company_short = text(row, &["EMPRESA_CORTA", "empresaCorta"]);
    tender.service_type = text(row, &["TIPO_SERVICIO", "tipoServicio"]);
    Ok(tender)
}

pub fn schedule_from_row(value: &Value) -> Result<ScheduleEntry, ValidationError> {
    let row = as_row(value)?;
    Ok(ScheduleEntry {
        nomenclature: required(row, NOMENCLATURE)?,
        phase: required(row, &["FASE", "fase", "ETAPA", "etapa"])?,
        starts_at: datetime(row, &["INICIO", "inicio", "FECHA_INICIO", "fechaInicio"]),
        ends_at: datetime(row, &["FIN", "fin", "FECHA_FIN", "fechaFin"]),
        status: PhaseStatus::from_label(&text_or_empty(row, &["ESTADO", "estado"])),
    })
}

pub fn tracked_from_row(value: &Value) -> Result<TrackedTender, ValidationError> {
    let row = as_row(value)?;
    let mut tracked = TrackedTender::new(required(row, NOMENCLATURE)?);
    tracked.status = InterestStatus::from_label(&text_or_empty(
        row,
        &["ESTADO_INTERES", "estadoInteres", "ESTADO", "estado"],
    ));
    tracked.priority = Priority::from_label(&text_or_empty(row, &["PRIORIDAD", "prioridad"]));
    tracked.notes = text_or_empty(row, &["NOTAS", "notas"]);
    tracked.added_on = date(row, &["FECHA_AGREGADO", "fechaAgregado"]);
    tracked.drive_folder = text(row, &["CARPETA_DRIVE", "carpetaDrive"]);
    tracked.entity = text(row, ENTITY);
    tracked.value = money(row, VALUE);
    tracked.object = text(row, OBJECT);
    tracked.deadline = date(row, &["FECHA_LIMITE", "fechaLimite"]);
    Ok(tracked)
}

pub fn document_from_row(value: &Value) -> Result<Document, ValidationError> {
    let row = as_row(value)?;
    Ok(Document {
        id: integer(row, ID),
        nomenclature: required(row, NOMENCLATURE)?,
        stage: text_or_empty(row, &["ETAPA", "etapa"]),
        kind: text_or_empty(row, &["TIPO_DOCUMENTO", "tipoDocumento"]),
        name: text_or_empty(row, &["NOMBRE_ARCHIVO", "nombreArchivo"]),
        url: text_or_empty(row, &["URL_ARCHIVO", "urlArchivo"]),
        drive_url: text(row, &["URL_DRIVE", "urlDrive"]),
        uploaded_on: date(row, &["FECHA_SUBIDA", "fechaSubida"]),
        notes: text_or_empty(row, &["NOTAS", "notas"]),
    })
}

// === Responses ===

pub fn tenders_from_response(value: &Value) -> Result<TenderPage, ValidationError> {
    let rows = rows(value, "procesos")?;
    let (tenders, skipped) = normalize_rows(rows, "tender", tender_from_row);
    let total = value
        .get("total")
        .and_then(Value::as_u64)
        .and_then(|t| usize::try_from(t).ok())
        .unwrap_or(rows.len());
    Ok(TenderPage {
        total,
        tenders,
        skipped,
    })
}

pub fn schedule_from_response(value: &Value) -> Result<Vec<ScheduleEntry>, ValidationError> {
    Ok(normalize_rows(rows(value, "cronograma")?, "schedule", schedule_from_row).0)
}

pub fn tracked_from_response(value: &Value) -> Result<Vec<TrackedTender>, ValidationError> {
    Ok(normalize_rows(rows(value, "seguimiento")?, "tracking", tracked_from_row).0)
}

pub fn documents_from_response(value: &Value) -> Result<Vec<Document>, ValidationError> {
    Ok(normalize_rows(rows(value, "documentos")?, "document", document_from_row).0)
}

pub fn statistics_from_response(value: &Value) -> Result<Statistics, ValidationError> {
    serde_json::from_value(value.clone()).map_err(|e| ValidationError::InvalidValue {
        field: "estadisticas".to_string(),
        reason: e.to_string(),
    })
}

pub fn entities_from_response(value: &Value) -> Result<Vec<EntitySummary>, ValidationError> {
    let rows = rows(value, "entidades")?;
    Ok(rows
        .iter()
        .filter_map(|row| serde_json::from_value::<EntitySummary>(row.clone()).ok())
        .filter(|entity| !entity.entity.trim().is_empty())
        .collect())
}

/// Regions keyed by name, as `{ "LIMA": { "count": 3, "valor": 1200.0 } }`,
/// ordered by tender count, largest first.
pub fn regions_from_response(value: &Value) -> Result<Vec<RegionSummary>, ValidationError> {
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(ValidationError::InvalidValue {
                field: "regiones".to_string(),
                reason: "expected an object keyed by region".to_string(),
            })
        }
    };

    let mut regions: Vec<RegionSummary> = map
        .iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, data)| RegionSummary {
            region: name.clone(),
            count: data.get("count").and_then(Value::as_u64).unwrap_or(0),
            value: data.get("valor").and_then(parse_money).unwrap_or(0.0),
        })
        .collect();
    regions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.region.cmp(&b.region)));
    Ok(regions)
}
