//! Historical tender matching.
//!
//! For a reference tender, scan a candidate universe for earlier or later
//! editions of the same contract. A candidate is kept when it comes from the
//! same contracting entity and either shares the reference's nomenclature
//! lineage (exact recurrence) or has a similar enough description (fuzzy
//! similarity).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use seace_core::{MatcherSettings, Tender};

use crate::scorer::{Similarity, SimilarityScorer};

pub const DEFAULT_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Minimum description similarity for a fuzzy match.
    pub threshold: f64,
    /// Require the candidate's object category to equal the reference's.
    pub same_object_only: bool,
    /// Require the candidate to be published strictly before the reference.
    /// Undated candidates never qualify, and neither does anything when the
    /// reference itself is undated.
    pub earlier_only: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            same_object_only: false,
            earlier_only: false,
        }
    }
}

impl From<&MatcherSettings> for MatcherConfig {
    fn from(settings: &MatcherSettings) -> Self {
        Self {
            threshold: settings.threshold,
            same_object_only: settings.same_object_only,
            earlier_only: settings.earlier_only,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// Same procedure type, modality and entity code in a different period.
    ExactRecurrence,
    /// Same entity and a description similarity at or above the threshold.
    FuzzySimilarity,
}

/// A candidate tender judged to be a historical edition of the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMatch {
    pub tender: Tender,
    pub score: f64,
    pub keywords: Vec<String>,
    pub kind: MatchKind,
    /// Reference year minus candidate year, when both are known.
    pub years_before: Option<i32>,
}

impl HistoricalMatch {
    pub fn is_exact_recurrence(&self) -> bool {
        self.kind == MatchKind::ExactRecurrence
    }

    /// Year the match is bucketed under.
    pub fn year(&self) -> Option<i32> {
        self.tender.year()
    }
}

/// Matches sharing a year. `year` is `None` for the unknown-year bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearBucket {
    pub year: Option<i32>,
    pub matches: Vec<HistoricalMatch>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoricalMatcher {
    config: MatcherConfig,
    scorer: SimilarityScorer,
}

impl HistoricalMatcher {
    pub fn new(config: MatcherConfig, scorer: SimilarityScorer) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Find the historical editions of `reference` among `candidates`.
    ///
    /// Results are ordered by publication date, most recent first, with
    /// undated matches last; ties are broken by higher score.
    pub fn find_historicals(&self, reference: &Tender, candidates: &[Tender]) -> Vec<HistoricalMatch> {
        let reference_tokens = self.scorer.tokenize(&reference.description);
        let reference_code = reference.parsed_nomenclature();
        let reference_year = reference.year();

        let mut matches: Vec<HistoricalMatch> = candidates
            .iter()
            .filter(|candidate| !reference.is_same_tender(candidate))
            .filter(|candidate| reference.same_entity(candidate))
            .filter(|candidate| self.passes_filters(reference, candidate))
            .filter_map(|candidate| {
                let similarity = if reference_tokens.is_empty() {
                    Similarity::none()
                } else {
                    self.scorer
                        .score_tokens(&reference_tokens, &self.scorer.tokenize(&candidate.description))
                };

                let exact = match (&reference_code, candidate.parsed_nomenclature()) {
                    (Some(reference_code), Some(code)) => code.is_recurrence_of(reference_code),
                    _ => false,
                };

                let kind = if exact {
                    MatchKind::ExactRecurrence
                } else if similarity.score >= self.config.threshold {
                    MatchKind::FuzzySimilarity
                } else {
                    return None;
                };

                let years_before = match (reference_year, candidate.year()) {
                    (Some(r), Some(c)) => Some(r - c),
                    _ => None,
                };

                Some(HistoricalMatch {
                    tender: candidate.clone(),
                    score: similarity.score,
                    keywords: similarity.keywords,
                    kind,
                    years_before,
                })
            })
            .collect();

        matches.sort_by(compare_recency);

        tracing::debug!(
            nomenclature = %reference.nomenclature,
            candidates = candidates.len(),
            matches = matches.len(),
            "historical matching complete"
        );
        matches
    }

    fn passes_filters(&self, reference: &Tender, candidate: &Tender) -> bool {
        if self.config.same_object_only && reference.object != candidate.object {
            return false;
        }
        if self.config.earlier_only {
            return matches!(
                (candidate.published_on, reference.published_on),
                (Some(candidate_date), Some(reference_date)) if candidate_date < reference_date
            );
        }
        true
    }
}

fn compare_recency(a: &HistoricalMatch, b: &HistoricalMatch) -> Ordering {
    let by_date = match (a.tender.published_on, b.tender.published_on) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| b.score.total_cmp(&a.score))
}

/// Bucket matches by year, newest year first, with the unknown-year bucket
/// last. Order within a bucket is preserved.
pub fn group_by_year(matches: Vec<HistoricalMatch>) -> Vec<YearBucket> {
    let mut known: BTreeMap<i32, Vec<HistoricalMatch>> = BTreeMap::new();
    let mut unknown = Vec::new();

    for m in matches {
        match m.year() {
            Some(year) => known.entry(year).or_default().push(m),
            None => unknown.push(m),
        }
    }

    let mut buckets: Vec<YearBucket> = known
        .into_iter()
        .rev()
        .map(|(year, matches)| YearBucket {
            year: Some(year),
            matches,
        })
        .collect();

    if !unknown.is_empty() {
        buckets.push(YearBucket {
            year: None,
            matches: unknown,
        });
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use seace_core::ContractObject;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference() -> Tender {
        Tender::new(
            100,
            "AS-SM-15-2024-HIDRANDINA-1",
            "HIDRANDINA",
            "mantenimiento de redes primarias",
        )
        .published(date(2024, 3, 1))
        .with_object(ContractObject::Services)
    }

    #[test]
    fn test_fuzzy_match_same_entity() {
        let candidate = Tender::new(
            1,
            "AS-SM-40-2022-OTRA-1",
            "HIDRANDINA",
            "mantenimiento de redes primarias y secundarias",
        )
        .published(date(2022, 2, 1));

        let matches = HistoricalMatcher::default().find_historicals(&reference(), &[candidate]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::FuzzySimilarity);
        assert!((matches[0].score - 0.75).abs() < 1e-9);
        assert_eq!(matches[0].years_before, Some(2));
    }

    #[test]
    fn test_exact_recurrence_ignores_threshold() {
        let candidate = Tender::new(2, "AS-SM-15-2023-HIDRANDINA-1", "HIDRANDINA", "vigilancia")
            .published(date(2023, 3, 1));

        let matches = HistoricalMatcher::default().find_historicals(&reference(), &[candidate]);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_exact_recurrence());
        assert_eq!(matches[0].score, 0.0);
    }

    #[test]
    fn test_excludes_self_and_other_entities() {
        let myself = reference();
        let same_code = Tender::new(7, "AS-SM-15-2024-HIDRANDINA-1", "HIDRANDINA", "otra cosa");
        let other_entity = Tender::new(3, "AS-SM-15-2023-SEAL-1", "SEAL", "mantenimiento de redes primarias");

        let matches = HistoricalMatcher::default()
            .find_historicals(&reference(), &[myself, same_code, other_entity]);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_ordering_most_recent_first_then_score() {
        let a = Tender::new(1, "X-1", "HIDRANDINA", "mantenimiento de redes primarias")
            .published(date(2021, 1, 1));
        let b = Tender::new(2, "X-2", "HIDRANDINA", "mantenimiento de redes primarias y secundarias")
            .published(date(2023, 1, 1));
        let c = Tender::new(3, "X-3", "HIDRANDINA", "mantenimiento de redes primarias")
            .published(date(2023, 1, 1));
        let undated = Tender::new(4, "X-4", "HIDRANDINA", "mantenimiento de redes primarias");

        let matches = HistoricalMatcher::default().find_historicals(&reference(), &[a, b, c, undated]);
        let ids: Vec<i64> = matches.iter().map(|m| m.tender.id).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_same_object_filter() {
        let goods = Tender::new(1, "X-1", "HIDRANDINA", "mantenimiento de redes primarias")
            .with_object(ContractObject::Goods);
        let config = MatcherConfig {
            same_object_only: true,
            ..MatcherConfig::default()
        };
        let matcher = HistoricalMatcher::new(config, SimilarityScorer::default());
        assert!(matcher.find_historicals(&reference(), &[goods.clone()]).is_empty());
        assert_eq!(HistoricalMatcher::default().find_historicals(&reference(), &[goods]).len(), 1);
    }

    #[test]
    fn test_earlier_only_filter() {
        let later = Tender::new(1, "X-1", "HIDRANDINA", "mantenimiento de redes primarias")
            .published(date(2025, 1, 1));
        let earlier = Tender::new(2, "X-2", "HIDRANDINA", "mantenimiento de redes primarias")
            .published(date(2020, 1, 1));
        let undated = Tender::new(3, "X-3", "HIDRANDINA", "mantenimiento de redes primarias");
        let config = MatcherConfig {
            earlier_only: true,
            ..MatcherConfig::default()
        };
        let matcher = HistoricalMatcher::new(config, SimilarityScorer::default());
        let matches = matcher.find_historicals(&reference(), &[later, earlier, undated]);
        let ids: Vec<i64> = matches.iter().map(|m| m.tender.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_earlier_only_with_undated_reference_keeps_nothing() {
        let undated_reference = Tender::new(
            10,
            "AS-SM-15-2024-HIDRANDINA-1",
            "HIDRANDINA",
            "mantenimiento de redes primarias",
        );
        let dated = Tender::new(1, "X-1", "HIDRANDINA", "mantenimiento de redes primarias")
            .published(date(2020, 1, 1));
        let undated = Tender::new(2, "X-2", "HIDRANDINA", "mantenimiento de redes primarias");
        let candidates = [dated, undated];

        let config = MatcherConfig {
            earlier_only: true,
            ..MatcherConfig::default()
        };
        let matcher = HistoricalMatcher::new(config, SimilarityScorer::default());
        assert!(matcher.find_historicals(&undated_reference, &candidates).is_empty());
        assert_eq!(
            HistoricalMatcher::default()
                .find_historicals(&undated_reference, &candidates)
                .len(),
            2
        );
    }

    #[test]
    fn test_group_by_year() {
        let t2023 = Tender::new(1, "AS-SM-1-2023-HIDRANDINA-1", "HIDRANDINA", "mantenimiento de redes primarias");
        let t2021 = Tender::new(2, "AS-SM-1-2021-HIDRANDINA-1", "HIDRANDINA", "mantenimiento de redes primarias");
        let dated = Tender::new(3, "SIN", "HIDRANDINA", "mantenimiento de redes primarias")
            .published(date(2023, 5, 5));
        let unknown = Tender::new(4, "SIN", "HIDRANDINA", "mantenimiento de redes primarias");

        let matches = HistoricalMatcher::default().find_historicals(&reference(), &[t2023, t2021, dated, unknown]);
        let buckets = group_by_year(matches);
        let years: Vec<Option<i32>> = buckets.iter().map(|b| b.year).collect();
        assert_eq!(years, vec![Some(2023), Some(2021), None]);
        assert_eq!(buckets[0].matches.len(), 2);
        assert_eq!(buckets[2].matches[0].tender.id, 4);
    }

    #[test]
    fn test_group_by_year_empty() {
        assert!(group_by_year(Vec::new()).is_empty());
    }
}
