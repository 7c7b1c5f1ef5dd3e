//! Plain-text rendering of command results.

use std::fmt::Write as _;

use seace_cache::CacheStats;
use seace_client::TenderPage;
use seace_core::{Currency, Tender};
use seace_history::{HistoryReport, MatchKind, Trend, TrendDirection};

/// `1234567.891` as `1,234,567.89`.
pub fn group_thousands(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn money(value: Option<f64>, currency: Currency) -> String {
    match value {
        Some(amount) => format!("{} {}", currency.code(), group_thousands(amount)),
        None => "-".to_string(),
    }
}

fn published(tender: &Tender) -> String {
    tender
        .published_on
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_history(report: &HistoryReport) -> String {
    let reference = &report.reference;
    let mut out = String::new();

    let _ = writeln!(out, "{}  {}", reference.nomenclature, reference.entity);
    let _ = writeln!(out, "  {}", reference.description);
    let _ = writeln!(
        out,
        "  {}  published {}",
        money(reference.value, reference.currency),
        published(reference)
    );
    let _ = writeln!(out);

    if report.buckets.is_empty() {
        let _ = writeln!(out, "No historical editions found.");
        return out;
    }

    for bucket in &report.buckets {
        let year = bucket
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "Unknown year".to_string());
        let _ = writeln!(out, "{} ({})", year, bucket.matches.len());

        for m in &bucket.matches {
            let kind = match m.kind {
                MatchKind::ExactRecurrence => "recurrence".to_string(),
                MatchKind::FuzzySimilarity => format!("{:.0}% similar", m.score * 100.0),
            };
            let _ = writeln!(
                out,
                "  {:<32} {:>20}  {}  [{}]",
                m.tender.nomenclature,
                money(m.tender.value, m.tender.currency),
                published(&m.tender),
                kind
            );
            if !m.keywords.is_empty() {
                let _ = writeln!(out, "    keywords: {}", m.keywords.join(", "));
            }
        }
    }
    let _ = writeln!(out);

    match &report.trend {
        Trend::Unavailable => {
            let _ = writeln!(out, "Trend: unavailable");
        }
        Trend::Available(summary) => {
            let direction = match summary.direction {
                TrendDirection::Rising => "rising",
                TrendDirection::Falling => "falling",
                TrendDirection::Stable => "stable",
            };
            let _ = writeln!(
                out,
                "Trend: {} over {} editions, {:.1} per year",
                direction, summary.total_matches, summary.annual_frequency
            );
            if let Some(values) = &summary.values {
                let _ = writeln!(
                    out,
                    "  average {}  min {}  max {}",
                    group_thousands(values.average),
                    group_thousands(values.min),
                    group_thousands(values.max)
                );
            }
            if let Some(latest) = summary.latest_match {
                let _ = writeln!(out, "  latest edition {}", latest.format("%d/%m/%Y"));
            }
        }
    }
    out
}

pub fn render_tenders(page: &TenderPage) -> String {
    let mut out = String::new();
    for tender in &page.tenders {
        let _ = writeln!(
            out,
            "{:<32} {:<24} {:>20}  {}",
            tender.nomenclature,
            tender.entity,
            money(tender.value, tender.currency),
            published(tender)
        );
    }
    let _ = write!(out, "{} of {} tenders", page.tenders.len(), page.total);
    if page.skipped > 0 {
        let _ = write!(out, " ({} unreadable rows skipped)", page.skipped);
    }
    out.push('\n');
    out
}

pub fn render_cache_stats(stats: &CacheStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "entries:  {}", stats.entries);
    let _ = writeln!(out, "size:     {:.1} KB", stats.size_kb());
    let _ = writeln!(
        out,
        "hit rate: {:.0}% ({} hits, {} misses)",
        stats.hit_rate() * 100.0,
        stats.hits,
        stats.misses
    );
    if !stats.actions.is_empty() {
        let _ = writeln!(out, "actions:  {}", stats.actions.join(", "));
    }
    out
}
