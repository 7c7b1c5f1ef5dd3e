//! Nomenclature codes.
//!
//! A SEACE nomenclature identifies a tender and, through its structural
//! components, the lineage of a recurring contract:
//!
//! ```text
//! AS-SM-15-2023-HIDRANDINA-1
//! |  |  |  |    |          +-- version (restart counter, optional)
//! |  |  |  |    +------------- entity code (may itself contain dashes)
//! |  |  |  +------------------ year
//! |  |  +--------------------- sequence number within the year
//! |  +------------------------ modality
//! +--------------------------- procedure type
//! ```

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year pattern is valid"));

/// Minimum number of dash-separated segments in a well-formed code.
const MIN_SEGMENTS: usize = 5;

/// Parsed nomenclature code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nomenclature {
    /// Procedure type (`AS`, `LP`, `CP`, ...).
    pub kind: String,
    /// Modality (`SM`, `SIE`, ...).
    pub modality: String,
    /// Sequence number within the year, kept verbatim.
    pub number: String,
    /// Four-digit year, when the year segment is one.
    pub year: Option<i32>,
    /// Entity code.
    pub entity_code: String,
    /// Version / restart counter.
    pub version: Option<u32>,
}

impl Nomenclature {
    /// Parse a nomenclature code. Returns `None` for anything that does not
    /// have the five mandatory segments.
    pub fn parse(code: &str) -> Option<Self> {
        let upper = code.trim().to_uppercase();
        let parts: Vec<&str> = upper.split('-').map(str::trim).collect();
        if parts.len() < MIN_SEGMENTS || parts[..3].iter().any(|p| p.is_empty()) {
            return None;
        }

        let year = parse_year(parts[3]);

        let (entity_parts, version) = match parts.len() {
            MIN_SEGMENTS => (&parts[4..], None),
            n => match parts[n - 1].parse::<u32>() {
                Ok(version) => (&parts[4..n - 1], Some(version)),
                Err(_) => (&parts[4..], None),
            },
        };
        let entity_code = entity_parts.join("-");
        if entity_code.is_empty() {
            return None;
        }

        Some(Self {
            kind: parts[0].to_string(),
            modality: parts[1].to_string(),
            number: parts[2].to_string(),
            year,
            entity_code,
            version,
        })
    }

    /// True when both codes belong to the same recurring-contract lineage:
    /// same procedure type, modality and entity code.
    pub fn same_lineage(&self, other: &Nomenclature) -> bool {
        self.kind == other.kind
            && self.modality == other.modality
            && self.entity_code == other.entity_code
    }

    /// True when `self` is the same recurring contract as `other` in a
    /// different period: same lineage, different year or sequence number.
    pub fn is_recurrence_of(&self, other: &Nomenclature) -> bool {
        self.same_lineage(other) && (self.year != other.year || self.number != other.number)
    }
}

impl fmt::Display for Nomenclature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.kind, self.modality, self.number, year, self.entity_code
        )?;
        if let Some(version) = self.version {
            write!(f, "-{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for Nomenclature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nomenclature::parse(s).ok_or_else(|| ValidationError::MalformedNomenclature {
            code: s.to_string(),
            reason: format!("expected at least {} non-empty segments", MIN_SEGMENTS),
        })
    }
}

fn parse_year(segment: &str) -> Option<i32> {
    if segment.len() == 4 && segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

/// Find the first plausible four-digit year anywhere in a code.
///
/// Used for codes that do not parse structurally.
pub fn extract_year(code: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(code)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_code() {
        let n = Nomenclature::parse("AS-SM-15-2023-HIDRANDINA-1").unwrap();
        assert_eq!(n.kind, "AS");
        assert_eq!(n.modality, "SM");
        assert_eq!(n.number, "15");
        assert_eq!(n.year, Some(2023));
        assert_eq!(n.entity_code, "HIDRANDINA");
        assert_eq!(n.version, Some(1));
    }

    #[test]
    fn test_parse_without_version() {
        let n = Nomenclature::parse("cp-sm-7-2022-else").unwrap();
        assert_eq!(n.kind, "CP");
        assert_eq!(n.entity_code, "ELSE");
        assert_eq!(n.version, None);
    }

    #[test]
    fn test_parse_entity_code_with_dashes() {
        let n = Nomenclature::parse("LP-SM-3-2024-ELECTRO-SUR-ESTE-2").unwrap();
        assert_eq!(n.entity_code, "ELECTRO-SUR-ESTE");
        assert_eq!(n.version, Some(2));
    }

    #[test]
    fn test_parse_rejects_short_codes() {
        assert!(Nomenclature::parse("AS-SM-15-2023").is_none());
        assert!(Nomenclature::parse("").is_none());
        assert!(Nomenclature::parse("--15-2023-X").is_none());
        assert!("AS-SM".parse::<Nomenclature>().is_err());
    }

    #[test]
    fn test_parse_non_numeric_year_segment() {
        let n = Nomenclature::parse("AS-SM-15-XX-SEAL-1").unwrap();
        assert_eq!(n.year, None);
    }

    #[test]
    fn test_recurrence_requires_lineage_and_different_period() {
        let current = Nomenclature::parse("AS-SM-15-2024-HIDRANDINA-1").unwrap();
        let last_year = Nomenclature::parse("AS-SM-15-2023-HIDRANDINA-1").unwrap();
        let restart = Nomenclature::parse("AS-SM-15-2024-HIDRANDINA-2").unwrap();
        let other_entity = Nomenclature::parse("AS-SM-15-2023-SEAL-1").unwrap();
        let other_modality = Nomenclature::parse("LP-SM-15-2023-HIDRANDINA-1").unwrap();

        assert!(last_year.is_recurrence_of(&current));
        assert!(!restart.is_recurrence_of(&current));
        assert!(!other_entity.is_recurrence_of(&current));
        assert!(!other_modality.is_recurrence_of(&current));
    }

    #[test]
    fn test_display_round_trip() {
        let code = "AS-SM-15-2023-HIDRANDINA-1";
        let n: Nomenclature = code.parse().unwrap();
        assert_eq!(n.to_string(), code);
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("CP-SM-7-2022-ELSE-1"), Some(2022));
        assert_eq!(extract_year("SIN-AÑO"), None);
        assert_eq!(extract_year("ADS-12345-X"), None);
    }
}
