//! Fuzz target: request body coercion.
//!
//! Arbitrary bytes are parsed as a JSON body and every field is pushed
//! through the coercers. Errors are fine; panics are not.

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use sitarida_core::coerce;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let Some(obj) = body.as_object() else {
        return;
    };
    for (key, v) in obj {
        let _ = coerce::to_num(v);
        let _ = coerce::to_int(v);
        let _ = coerce::to_big(v);
        let _ = coerce::to_flag(v);
        if let Ok(Some(d)) = coerce::to_dec(v) {
            // Accepted decimals render back to a parsable number.
            assert!(d.to_string().parse::<f64>().is_ok(), "{d}");
        }
        if let Some(s) = coerce::opt_str(&body, key) {
            assert!(!s.trim().is_empty());
        }
    }
});
