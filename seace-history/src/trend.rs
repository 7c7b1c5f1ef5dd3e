//! Trend summaries over matched historicals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use seace_core::{Tender, TrendSettings};

use crate::matcher::HistoricalMatch;

pub const DEFAULT_MARGIN: f64 = 0.10;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    /// Relative band around the historical average inside which the
    /// reference value counts as stable.
    pub margin: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
        }
    }
}

impl From<&TrendSettings> for TrendConfig {
    fn from(settings: &TrendSettings) -> Self {
        Self {
            margin: settings.margin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub total_matches: usize,
    /// `None` when no match carries a value.
    pub values: Option<ValueStats>,
    /// Matches per year over the dated span, floored at one year.
    pub annual_frequency: f64,
    pub latest_match: Option<NaiveDate>,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Trend {
    /// No historicals to summarize.
    Unavailable,
    Available(TrendSummary),
}

impl Trend {
    pub fn summary(&self) -> Option<&TrendSummary> {
        match self {
            Trend::Available(summary) => Some(summary),
            Trend::Unavailable => None,
        }
    }
}

/// Summarize `matches` relative to `reference`.
pub fn calculate_trend(reference: &Tender, matches: &[HistoricalMatch], config: &TrendConfig) -> Trend {
    if matches.is_empty() {
        return Trend::Unavailable;
    }

    let values = value_stats(matches.iter().filter_map(|m| m.tender.value));

    let dates: Vec<NaiveDate> = matches.iter().filter_map(|m| m.tender.published_on).collect();
    let earliest = dates.iter().min().copied();
    let latest = dates.iter().max().copied();

    let span_years = match (earliest, latest) {
        (Some(first), Some(last)) => (last - first).num_days() as f64 / DAYS_PER_YEAR,
        _ => 0.0,
    };
    let annual_frequency = matches.len() as f64 / span_years.max(1.0);

    let direction = match (reference.value, &values) {
        (Some(current), Some(stats)) => direction(current, stats.average, config.margin),
        _ => TrendDirection::Stable,
    };

    Trend::Available(TrendSummary {
        total_matches: matches.len(),
        values,
        annual_frequency,
        latest_match: latest,
        direction,
    })
}

fn value_stats(values: impl Iterator<Item = f64>) -> Option<ValueStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.filter(|v| v.is_finite()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    (count > 0).then(|| ValueStats {
        average: sum / count as f64,
        min,
        max,
    })
}

fn direction(current: f64, average: f64, margin: f64) -> TrendDirection {
    if current > average * (1.0 + margin) {
        TrendDirection::Rising
    } else if current < average * (1.0 - margin) {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchKind;
    use seace_core::Currency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn matched(id: i64, value: Option<f64>, published: Option<NaiveDate>) -> HistoricalMatch {
        let mut tender = Tender::new(id, format!("X-{}", id), "HIDRANDINA", "mantenimiento");
        tender.value = value;
        tender.published_on = published;
        HistoricalMatch {
            tender,
            score: 1.0,
            keywords: vec!["mantenimiento".to_string()],
            kind: MatchKind::FuzzySimilarity,
            years_before: None,
        }
    }

    fn reference(value: Option<f64>) -> Tender {
        let mut t = Tender::new(0, "REF", "HIDRANDINA", "mantenimiento");
        t.value = value;
        t
    }

    #[test]
    fn test_empty_is_unavailable() {
        let trend = calculate_trend(&reference(Some(10.0)), &[], &TrendConfig::default());
        assert_eq!(trend, Trend::Unavailable);
        assert!(trend.summary().is_none());
    }

    #[test]
    fn test_value_stats_and_frequency() {
        let matches = vec![
            matched(1, Some(100.0), Some(date(2020, 1, 1))),
            matched(2, Some(200.0), Some(date(2022, 1, 1))),
            matched(3, None, Some(date(2024, 1, 1))),
        ];
        let trend = calculate_trend(&reference(Some(150.0)), &matches, &TrendConfig::default());
        let summary = trend.summary().unwrap();
        let values = summary.values.as_ref().unwrap();

        assert_eq!(summary.total_matches, 3);
        assert_eq!(values.average, 150.0);
        assert_eq!(values.min, 100.0);
        assert_eq!(values.max, 200.0);
        assert_eq!(summary.latest_match, Some(date(2024, 1, 1)));
        assert!((summary.annual_frequency - 0.75).abs() < 0.01);
        assert_eq!(summary.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_frequency_floors_span_at_one_year() {
        let matches = vec![
            matched(1, Some(1.0), Some(date(2023, 1, 1))),
            matched(2, Some(1.0), Some(date(2023, 6, 1))),
        ];
        let summary = calculate_trend(&reference(None), &matches, &TrendConfig::default());
        assert_eq!(summary.summary().unwrap().annual_frequency, 2.0);
    }

    #[test]
    fn test_direction_bands() {
        let matches = vec![matched(1, Some(100.0), None)];
        let config = TrendConfig::default();
        let dir = |v: f64| {
            calculate_trend(&reference(Some(v)), &matches, &config)
                .summary()
                .unwrap()
                .direction
        };
        assert_eq!(dir(111.0), TrendDirection::Rising);
        assert_eq!(dir(110.0), TrendDirection::Stable);
        assert_eq!(dir(95.0), TrendDirection::Stable);
        assert_eq!(dir(89.0), TrendDirection::Falling);
    }

    #[test]
    fn test_missing_values_degrade_to_stable() {
        let matches = vec![matched(1, None, None)];
        let summary = calculate_trend(&reference(Some(1_000.0)), &matches, &TrendConfig::default());
        let summary = summary.summary().unwrap().clone();
        assert!(summary.values.is_none());
        assert!(summary.latest_match.is_none());
        assert_eq!(summary.annual_frequency, 1.0);
        assert_eq!(summary.direction, TrendDirection::Stable);

        let no_reference_value = calculate_trend(
            &reference(None),
            &[matched(2, Some(5.0), None)],
            &TrendConfig::default(),
        );
        assert_eq!(
            no_reference_value.summary().unwrap().direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_currency_is_not_converted() {
        let mut usd = matched(1, Some(10.0), None);
        usd.tender.currency = Currency::Usd;
        let summary = calculate_trend(&reference(Some(10.0)), &[usd], &TrendConfig::default());
        assert_eq!(summary.summary().unwrap().values.as_ref().unwrap().average, 10.0);
    }
}
