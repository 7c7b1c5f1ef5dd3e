//! SEACE History - Recurring Tender Analysis
//!
//! Pure functions over canonical tenders: description similarity, the
//! historical matcher and the trend calculator. Nothing here performs I/O.

pub mod matcher;
pub mod scorer;
pub mod trend;

pub use matcher::{
    group_by_year, HistoricalMatch, HistoricalMatcher, MatchKind, MatcherConfig, YearBucket,
};
pub use scorer::{ScorerConfig, Similarity, SimilarityScorer, DEFAULT_STOP_WORDS};
pub use trend::{calculate_trend, Trend, TrendConfig, TrendDirection, TrendSummary, ValueStats};

use serde::Serialize;

use seace_core::Tender;

/// Everything shown for one reference tender: its matches, grouped by year,
/// and the trend over them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub reference: Tender,
    pub buckets: Vec<YearBucket>,
    pub trend: Trend,
}

impl HistoryReport {
    pub fn total_matches(&self) -> usize {
        self.buckets.iter().map(|b| b.matches.len()).sum()
    }
}

/// Run matching, grouping and trend calculation for `reference`.
pub fn analyze(
    reference: &Tender,
    candidates: &[Tender],
    matcher: &HistoricalMatcher,
    trend: &TrendConfig,
) -> HistoryReport {
    let matches = matcher.find_historicals(reference, candidates);
    let trend = calculate_trend(reference, &matches, trend);
    HistoryReport {
        reference: reference.clone(),
        buckets: group_by_year(matches),
        trend,
    }
}
