#![no_main]

use libfuzzer_sys::fuzz_target;
use wasmval_core::{SkipKey, SkipSet};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = SkipSet::from_json(s);
        // A key that parses must print back to the same text
        if let Ok(key) = s.parse::<SkipKey>() {
            assert_eq!(key.to_string(), s);
        }
    }
});
