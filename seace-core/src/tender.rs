//! Tender (proceso) records.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::nomenclature::{extract_year, Nomenclature};
use crate::text::{fold_text, normalize_label};

/// Backend row identifier.
pub type TenderId = i64;

/// Currency of a tender's reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Pen,
    Usd,
    Eur,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Pen => "PEN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Map a free-form currency label to a currency. Dollar and euro labels
    /// are recognized; anything else (including blanks) is soles.
    pub fn from_label(label: &str) -> Self {
        let upper = normalize_label(label);
        if upper == "USD" || upper.contains("DOLAR") {
            Currency::Usd
        } else if upper == "EUR" || upper.contains("EURO") {
            Currency::Eur
        } else {
            Currency::Pen
        }
    }
}

/// Object-of-contract category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractObject {
    /// "Bien"
    Goods,
    /// "Servicio"
    Services,
    /// "Obra"
    Works,
    /// "Consultoría de Obra"
    WorksConsulting,
    /// Any label the backend sends that is not one of the above.
    Other(String),
}

impl ContractObject {
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "BIEN" | "BIENES" => ContractObject::Goods,
            "SERVICIO" | "SERVICIOS" => ContractObject::Services,
            "OBRA" | "OBRAS" => ContractObject::Works,
            "CONSULTORIA DE OBRA" | "CONSULTORIA DE OBRAS" => ContractObject::WorksConsulting,
            _ => ContractObject::Other(label.trim().to_string()),
        }
    }

    /// Label as the SEACE platform spells it.
    pub fn label(&self) -> &str {
        match self {
            ContractObject::Goods => "Bien",
            ContractObject::Services => "Servicio",
            ContractObject::Works => "Obra",
            ContractObject::WorksConsulting => "Consultoría de Obra",
            ContractObject::Other(label) => label,
        }
    }
}

impl Default for ContractObject {
    fn default() -> Self {
        ContractObject::Other(String::new())
    }
}

/// A public procurement process as published on SEACE.
///
/// Read-only from the core's point of view; `restarted_from` is the only
/// field the backend rewrites after publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    pub id: TenderId,
    pub nomenclature: String,
    pub entity: String,
    pub description: String,
    pub value: Option<f64>,
    pub currency: Currency,
    pub published_on: Option<NaiveDate>,
    pub object: ContractObject,
    pub region: String,
    pub version: Option<u32>,
    pub restarted_from: Option<String>,
    pub url: Option<String>,
    /// Short company name from the backend's automatic classification.
    pub company_short: Option<String>,
    /// Service type from the backend's automatic classification.
    pub service_type: Option<String>,
}

impl Tender {
    /// Create a tender with the identifying fields set and everything else
    /// empty.
    pub fn new(
        id: TenderId,
        nomenclature: impl Into<String>,
        entity: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            nomenclature: nomenclature.into(),
            entity: entity.into(),
            description: description.into(),
            value: None,
            currency: Currency::default(),
            published_on: None,
            object: ContractObject::default(),
            region: String::new(),
            version: None,
            restarted_from: None,
            url: None,
            company_short: None,
            service_type: None,
        }
    }

    pub fn with_value(mut self, amount: f64, currency: Currency) -> Self {
        self.value = Some(amount);
        self.currency = currency;
        self
    }

    pub fn published(mut self, date: NaiveDate) -> Self {
        self.published_on = Some(date);
        self
    }

    pub fn with_object(mut self, object: ContractObject) -> Self {
        self.object = object;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Parsed nomenclature, if the code is well formed.
    pub fn parsed_nomenclature(&self) -> Option<Nomenclature> {
        Nomenclature::parse(&self.nomenclature)
    }

    /// Year the tender belongs to: the nomenclature's year when present,
    /// otherwise the publication date's year.
    pub fn year(&self) -> Option<i32> {
        self.parsed_nomenclature()
            .and_then(|n| n.year)
            .or_else(|| extract_year(&self.nomenclature))
            .or_else(|| self.published_on.map(|d| d.year()))
    }

    /// True when both tenders were issued by the same contracting entity.
    pub fn same_entity(&self, other: &Tender) -> bool {
        normalize_label(&self.entity) == normalize_label(&other.entity)
    }

    /// True when `other` is this very tender: same row id or same code.
    pub fn is_same_tender(&self, other: &Tender) -> bool {
        self.id == other.id || same_code(&self.nomenclature, &other.nomenclature)
    }
}

fn same_code(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty()
        && fold_text(a)
            .chars()
            .flat_map(char::to_uppercase)
            .eq(fold_text(b.trim()).chars().flat_map(char::to_uppercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_from_label() {
        assert_eq!(Currency::from_label("Dólares americanos"), Currency::Usd);
        assert_eq!(Currency::from_label("usd"), Currency::Usd);
        assert_eq!(Currency::from_label("EURO"), Currency::Eur);
        assert_eq!(Currency::from_label("Soles"), Currency::Pen);
        assert_eq!(Currency::from_label(""), Currency::Pen);
    }

    #[test]
    fn test_contract_object_from_label() {
        assert_eq!(ContractObject::from_label("Servicio"), ContractObject::Services);
        assert_eq!(ContractObject::from_label("BIEN"), ContractObject::Goods);
        assert_eq!(
            ContractObject::from_label("Consultoría de Obra"),
            ContractObject::WorksConsulting
        );
        assert_eq!(
            ContractObject::from_label("Arrendamiento"),
            ContractObject::Other("Arrendamiento".to_string())
        );
    }

    #[test]
    fn test_year_prefers_nomenclature() {
        let t = Tender::new(1, "AS-SM-15-2023-HIDRANDINA-1", "HIDRANDINA", "x")
            .published(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(t.year(), Some(2023));
    }

    #[test]
    fn test_year_falls_back_to_publication_date() {
        let t = Tender::new(1, "SIN-CODIGO", "HIDRANDINA", "x")
            .published(NaiveDate::from_ymd_opt(2021, 6, 30).unwrap());
        assert_eq!(t.year(), Some(2021));

        let undated = Tender::new(2, "", "HIDRANDINA", "x");
        assert_eq!(undated.year(), None);
    }

    #[test]
    fn test_same_entity_ignores_case_and_spacing() {
        let a = Tender::new(1, "A", "Empresa Regional  de Servicio Público", "");
        let b = Tender::new(2, "B", "EMPRESA REGIONAL DE SERVICIO PUBLICO", "");
        let c = Tender::new(3, "C", "SEAL", "");
        assert!(a.same_entity(&b));
        assert!(!a.same_entity(&c));
    }

    #[test]
    fn test_is_same_tender_by_id_or_code() {
        let a = Tender::new(1, "AS-SM-15-2023-HIDRANDINA-1", "HIDRANDINA", "");
        let same_id = Tender::new(1, "OTHER", "HIDRANDINA", "");
        let same_code = Tender::new(9, "as-sm-15-2023-hidrandina-1 ", "HIDRANDINA", "");
        let other = Tender::new(2, "AS-SM-16-2023-HIDRANDINA-1", "HIDRANDINA", "");
        assert!(a.is_same_tender(&same_id));
        assert!(a.is_same_tender(&same_code));
        assert!(!a.is_same_tender(&other));
    }

    #[test]
    fn test_blank_codes_never_match_each_other() {
        let a = Tender::new(1, "", "HIDRANDINA", "");
        let b = Tender::new(2, "", "HIDRANDINA", "");
        assert!(!a.is_same_tender(&b));
    }
}
