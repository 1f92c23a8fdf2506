//! Layering guardrails to keep the shared vocabulary crate free of the harness stack.
//!
//! `wasmval_core` holds plain data and the classification rules. Process handling, the worker pool, the CLI
//! and diagnostics rendering belong to the `wasmval` crate. This test scans the core `Cargo.toml` and fails if
//! any of those crates appears in its `[dependencies]`.

const HARNESS_ONLY: &[&str] = &["tokio", "clap", "miette", "tracing-subscriber", "chrono"];

#[test]
fn core_does_not_depend_on_harness_stack() {
    let manifest = include_str!("../crates/wasmval_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name = line.split(['=', ' ']).next().unwrap_or("").trim();
        if HARNESS_ONLY.contains(&name) {
            panic!("`{}` must not appear in wasmval_core [dependencies]; it belongs to the harness crate", name);
        }
    }
}

#[test]
fn core_is_a_workspace_member() {
    let manifest = include_str!("../Cargo.toml");
    assert!(manifest.contains("\"crates/wasmval_core\""));
}
