//! Fuzz target for nomenclature parsing.
//!
//! Run with: cargo +nightly fuzz run nomenclature_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use seace_core::{extract_year, Nomenclature};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = extract_year(input);

        if let Some(parsed) = Nomenclature::parse(input) {
            assert!(!parsed.kind.is_empty() && !parsed.entity_code.is_empty());
            let _ = Nomenclature::parse(&parsed.to_string());

            assert!(parsed.same_lineage(&parsed));
            assert!(!parsed.is_recurrence_of(&parsed), "a code is never its own recurrence");
        }
    }
});
