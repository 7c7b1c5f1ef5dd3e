//! SEACE Test Utilities
//!
//! Centralized test infrastructure for the SEACE workspace:
//! - Proptest generators for tenders, descriptions and codes
//! - In-memory and failing persistent tiers for cache tests
//! - Test fixtures for common scenarios
//! - Custom assertions for SEACE-specific validation

pub use seace_cache::{CacheEntry, PersistentStore, StoreError};
pub use seace_core::{
    ConfigError, ContractObject, Currency, Nomenclature, SeaceConfig, Tender, TenderId,
};

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

// ============================================================================
// PERSISTENT TIER DOUBLES
// ============================================================================

/// Persistent tier backed by a map, with counters for inspection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `entries`, as if left behind by a previous run.
    pub fn seeded(entries: impl IntoIterator<Item = (String, CacheEntry)>) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(entries);
        store
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `save` calls received so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistentStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Persistent tier whose every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl FailingStore {
    fn failure() -> StoreError {
        StoreError::Transaction("injected store failure".to_string())
    }
}

impl PersistentStore for FailingStore {
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>, StoreError> {
        Err(Self::failure())
    }

    fn save(&self, _key: &str, _entry: &CacheEntry) -> Result<(), StoreError> {
        Err(Self::failure())
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(Self::failure())
    }

    fn clear(&self) -> Result<(), StoreError> {
        Err(Self::failure())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating SEACE types.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Words that show up in real tender descriptions, accents included.
    pub const VOCABULARY: &[&str] = &[
        "servicio",
        "mantenimiento",
        "preventivo",
        "correctivo",
        "redes",
        "primarias",
        "secundarias",
        "subestaciones",
        "transformadores",
        "adquisición",
        "suministro",
        "medidores",
        "instalación",
        "electrificación",
        "rural",
        "línea",
        "transmisión",
        "supervisión",
        "obra",
        "vigilancia",
        "limpieza",
        "oficinas",
        "de",
        "del",
        "para",
        "la",
        "en",
        "2024",
    ];

    pub const ENTITY_CODES: &[&str] = &["HIDRANDINA", "SEAL", "ELECTRO-SUR", "ENOSA", "ELC"];

    /// Generate a description of 0 to 12 vocabulary words.
    pub fn arb_description() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(VOCABULARY), 0..12)
            .prop_map(|words| words.join(" "))
    }

    /// Generate arbitrary free text, including punctuation and accents.
    pub fn arb_free_text() -> impl Strategy<Value = String> {
        "[a-zA-ZáéíóúñÁÉÍÓÚÑ0-9 ,.;:()/-]{0,80}"
    }

    /// Generate a publication date between 2015 and 2025.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2015i32..=2025, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
        })
    }

    /// Generate a well-formed nomenclature code.
    pub fn arb_nomenclature() -> impl Strategy<Value = String> {
        (
            prop::sample::select(&["AS", "LP", "CP", "SIE"][..]),
            prop::sample::select(&["SM", "SIE", "PEC"][..]),
            1u32..60,
            2015i32..=2025,
            prop::sample::select(ENTITY_CODES),
            prop::option::of(1u32..4),
        )
            .prop_map(|(kind, modality, number, year, entity, version)| {
                let base = format!("{}-{}-{}-{}-{}", kind, modality, number, year, entity);
                match version {
                    Some(v) => format!("{}-{}", base, v),
                    None => base,
                }
            })
    }

    /// Generate a contract object.
    pub fn arb_contract_object() -> impl Strategy<Value = ContractObject> {
        prop_oneof![
            Just(ContractObject::Goods),
            Just(ContractObject::Services),
            Just(ContractObject::Works),
            Just(ContractObject::WorksConsulting),
        ]
    }

    /// Generate a tender issued by one of a handful of entities.
    pub fn arb_tender() -> impl Strategy<Value = Tender> {
        (
            1i64..100_000,
            arb_nomenclature(),
            prop::sample::select(&["HIDRANDINA S.A.", "SEAL", "Electro Sur Este"][..]),
            arb_description(),
            prop::option::of(1_000.0f64..5_000_000.0),
            prop::option::of(arb_date()),
            arb_contract_object(),
        )
            .prop_map(|(id, code, entity, description, value, date, object)| {
                let mut tender = Tender::new(id, code, entity, description).with_object(object);
                tender.value = value;
                tender.published_on = date;
                tender
            })
    }

    /// Generate a reference tender plus a candidate list with unique ids.
    pub fn arb_tender_pool(max: usize) -> impl Strategy<Value = (Tender, Vec<Tender>)> {
        (arb_tender(), prop::collection::vec(arb_tender(), 0..max)).prop_map(
            |(reference, mut candidates)| {
                for (i, candidate) in candidates.iter_mut().enumerate() {
                    candidate.id = reference.id + 1 + i as TenderId;
                }
                (reference, candidates)
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    pub const HIDRANDINA: &str = "HIDRANDINA S.A.";
    pub const SEAL: &str = "SEAL";

    /// Minimal valid configuration document.
    pub const MINIMAL_CONFIG_TOML: &str = r#"
[api]
base_url = "https://script.google.com/macros/s/test/exec"
"#;

    pub fn minimal_config() -> SeaceConfig {
        match SeaceConfig::from_toml(MINIMAL_CONFIG_TOML) {
            Ok(config) => config,
            Err(e) => panic!("fixture config should parse: {}", e),
        }
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(date) => date,
            None => panic!("invalid fixture date {}-{}-{}", y, m, d),
        }
    }

    /// The 2024 maintenance tender used as the reference in history tests.
    pub fn hidrandina_reference() -> Tender {
        Tender::new(
            100,
            "AS-SM-15-2024-HIDRANDINA-1",
            HIDRANDINA,
            "Servicio de mantenimiento preventivo de redes primarias",
        )
        .with_value(480_000.0, Currency::Pen)
        .published(date(2024, 3, 12))
        .with_object(ContractObject::Services)
        .with_region("LA LIBERTAD")
    }

    /// Prior HIDRANDINA tenders: two recurrences of the reference code, one
    /// fuzzy match, one unrelated purchase, plus a same-description tender
    /// from SEAL.
    pub fn hidrandina_history() -> Vec<Tender> {
        vec![
            Tender::new(
                90,
                "AS-SM-15-2023-HIDRANDINA-1",
                HIDRANDINA,
                "Servicio de mantenimiento preventivo de redes primarias 2023",
            )
            .with_value(450_000.0, Currency::Pen)
            .published(date(2023, 3, 2))
            .with_object(ContractObject::Services),
            Tender::new(
                80,
                "AS-SM-12-2022-HIDRANDINA-1",
                HIDRANDINA,
                "Servicio de mantenimiento de redes primarias",
            )
            .with_value(400_000.0, Currency::Pen)
            .published(date(2022, 2, 20))
            .with_object(ContractObject::Services),
            Tender::new(
                70,
                "LP-SM-3-2021-HIDRANDINA-1",
                HIDRANDINA,
                "Mantenimiento correctivo de redes primarias y secundarias",
            )
            .with_value(380_000.0, Currency::Pen)
            .published(date(2021, 6, 1))
            .with_object(ContractObject::Services),
            Tender::new(
                60,
                "CP-SIE-40-2023-HIDRANDINA-1",
                HIDRANDINA,
                "Adquisición de uniformes para personal",
            )
            .with_value(35_000.0, Currency::Pen)
            .published(date(2023, 8, 9))
            .with_object(ContractObject::Goods),
            Tender::new(
                50,
                "AS-SM-15-2023-SEAL-1",
                SEAL,
                "Servicio de mantenimiento preventivo de redes primarias",
            )
            .with_value(300_000.0, Currency::Pen)
            .published(date(2023, 4, 4))
            .with_object(ContractObject::Services),
        ]
    }

    /// A cache entry for `action` holding `value`.
    pub fn cache_entry(action: &str, value: serde_json::Value, ttl: Duration) -> CacheEntry {
        CacheEntry::new(action, value, ttl)
    }

    /// A cache entry that expired long ago.
    pub fn expired_cache_entry(action: &str, value: serde_json::Value) -> CacheEntry {
        let mut entry = CacheEntry::new(action, value, Duration::from_secs(60));
        entry.cached_at -= chrono::Duration::hours(2);
        entry
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for SEACE-specific validation.

    use super::*;

    /// Assert that a similarity score lies in the unit interval.
    #[track_caller]
    pub fn assert_unit_score(score: f64) {
        assert!(
            score.is_finite() && (0.0..=1.0).contains(&score),
            "Score {} not in [0, 1]",
            score
        );
    }

    /// Assert that every tender in `matches` shares `reference`'s entity and
    /// none of them is `reference` itself.
    #[track_caller]
    pub fn assert_valid_history<'a>(
        reference: &Tender,
        matches: impl IntoIterator<Item = &'a Tender>,
    ) {
        for tender in matches {
            assert!(
                !reference.is_same_tender(tender),
                "Reference tender {} matched itself",
                reference.nomenclature
            );
            assert!(
                reference.same_entity(tender),
                "Tender {} from '{}' does not belong to '{}'",
                tender.nomenclature,
                tender.entity,
                reference.entity
            );
        }
    }

    /// Assert that a config result is an invalid-value error for `field`.
    #[track_caller]
    pub fn assert_invalid_config_field<T: std::fmt::Debug>(
        result: &Result<T, ConfigError>,
        field: &str,
    ) {
        match result {
            Err(ConfigError::InvalidValue { field: f, .. }) if f == field => {}
            other => panic!("Expected invalid value for {}, got: {:?}", field, other),
        }
    }
}
