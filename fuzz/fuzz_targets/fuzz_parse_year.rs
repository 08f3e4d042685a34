//! Fuzz target: year and id path segments.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sitarida_core::coerce;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(year) = coerce::parse_year(raw) {
        assert!((coerce::MIN_YEAR..=coerce::MAX_YEAR).contains(&year));
    }
    if let Some(id) = coerce::parse_id(raw) {
        assert!(id > 0);
    }
    let limit = coerce::clamp_limit(Some(raw), 50, 500);
    assert!((1..=500).contains(&limit));
});
