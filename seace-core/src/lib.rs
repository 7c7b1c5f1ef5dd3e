//! SEACE Core - Canonical Types
//!
//! Data structures shared by every other crate in the workspace: tenders,
//! tracking records, the nomenclature code, configuration and errors.
//! Anything that arrives from the backend is normalized into these types
//! at the client boundary; nothing downstream sees raw sheet rows.

pub mod config;
pub mod error;
pub mod nomenclature;
pub mod tender;
pub mod text;
pub mod tracking;

pub use config::{
    ApiSettings, CacheSettings, LogSettings, MatcherSettings, PersistMode, SeaceConfig,
    TrendSettings,
};
pub use error::{ConfigError, SeaceError, SeaceResult, ValidationError};
pub use nomenclature::{extract_year, Nomenclature};
pub use tender::{ContractObject, Currency, Tender, TenderId};
pub use text::{fold_accents, fold_text, is_combining_mark, normalize_label};
pub use tracking::{
    Document, EntitySummary, InterestStatus, PhaseStatus, Priority, RegionSummary,
    ScheduleEntry, Statistics, TrackedTender,
};

/// Calendar date used for publication and schedule dates.
pub type Date = chrono::NaiveDate;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
