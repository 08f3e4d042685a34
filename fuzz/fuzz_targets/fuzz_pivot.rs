//! Fuzz target: indicator pivot over arbitrary long rows.
//!
//! Input lines are `kdiku;tahun;target`. Every output object must carry
//! `tahun` plus every mapped field, and years must not repeat.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sitarida_core::indicator::{Pivot, PivotValue, TargetRow};

const PIVOT: Pivot = Pivot {
    fields: &[("1001", "a"), ("1002", "b"), ("1003", "c")],
    value: PivotValue::Number,
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let rows: Vec<TargetRow> = text
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ';');
            Some(TargetRow {
                kdiku: parts.next()?.to_owned(),
                tahun: parts.next()?.to_owned(),
                target: parts.next().map(str::to_owned),
            })
        })
        .collect();
    let out = PIVOT.apply(&rows);
    let mut seen = std::collections::HashSet::new();
    for obj in &out {
        let Some(tahun) = obj["tahun"].as_str() else {
            panic!("tahun missing: {obj}");
        };
        assert!(seen.insert(tahun.to_owned()), "repeated year {tahun}");
        for (_, field) in PIVOT.fields {
            assert!(obj.get(*field).is_some(), "{field} missing");
        }
    }
});
