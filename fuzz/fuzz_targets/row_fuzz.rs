//! Fuzz target for backend response normalization.
//!
//! Any JSON document must normalize or be rejected, never panic.
//!
//! Run with: cargo +nightly fuzz run row_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use seace_client::adapter;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(page) = adapter::tenders_from_response(&value) {
        assert!(page.tenders.iter().all(|t| !t.nomenclature.trim().is_empty()));
        assert!(page.tenders.iter().all(|t| t.value.map_or(true, f64::is_finite)));
    }
    let _ = adapter::schedule_from_response(&value);
    let _ = adapter::tracked_from_response(&value);
    let _ = adapter::documents_from_response(&value);
    let _ = adapter::regions_from_response(&value);
    let _ = adapter::entities_from_response(&value);
    let _ = adapter::statistics_from_response(&value);
});
