#![no_main]

use libfuzzer_sys::fuzz_target;
use wasmval_core::ValidationManifest;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(manifest) = ValidationManifest::from_json(s) {
            // Accepted manifests must be usable: names non-empty, filtering never panics
            for module in manifest.modules() {
                assert!(!module.module.is_empty());
                for entry in &module.entries {
                    assert!(!entry.name.is_empty());
                    let _ = entry.arg_strings();
                }
            }
            let _ = manifest.filtered(":");
        }
    }
});
