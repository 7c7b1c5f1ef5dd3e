//! Fuzz target for description similarity.
//!
//! Run with: cargo +nightly fuzz run similarity_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use seace_history::SimilarityScorer;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut mid = input.len() / 2;
    while !input.is_char_boundary(mid) {
        mid -= 1;
    }
    let (a, b) = input.split_at(mid);

    let scorer = SimilarityScorer::default();
    let ab = scorer.score(a, b);
    let ba = scorer.score(b, a);

    assert!((0.0..=1.0).contains(&ab.score), "score out of range: {}", ab.score);
    assert_eq!(ab.score, ba.score, "similarity must be symmetric");
    assert!(ab.keywords.len() <= scorer.config().keyword_limit);
});
