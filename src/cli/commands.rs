//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::io::{self, Write};
use std::time::Instant;

use wasmval_core::{CaseId, SkipSet, ValidationManifest};

use super::{CliError, CliResult, ExitCode, RunArgs, SelectionArgs};
use crate::harness::{self, RunController, report};

// ============================================================================
// run
// ============================================================================

/// Validate every selected case and print the summary.
///
/// Exits with `1` when any case failed. The per-case details are in the log file.
pub fn run_validation(args: &RunArgs) -> CliResult<ExitCode> {
    let started = Instant::now();
    let config = args.to_config();

    let manifest = harness::load_manifest(&config.manifest)?;
    let skips = harness::load_skip_set(args.selection.skip_list.as_deref(), &args.selection.skip)?;

    let controller = RunController::from_config(config, skips);
    let summary = controller.run(&manifest)?;

    println!("{}", report::render_summary(&summary, started.elapsed()));
    tracing::info!("details written to {}", controller.config().log_file.display());

    Ok(ExitCode(summary.exit_code()))
}

// ============================================================================
// list
// ============================================================================

/// Print the selected cases in manifest order, marking the skipped ones.
pub fn list_cases(args: &SelectionArgs) -> CliResult<ExitCode> {
    let config = args.to_config();

    let manifest = harness::load_manifest(&config.manifest)?;
    let manifest = match &config.filter {
        Some(keyword) => manifest.filtered(keyword),
        None => manifest,
    };
    let skips = harness::load_skip_set(args.skip_list.as_deref(), &args.skip)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_case_list(&mut out, &manifest, &skips)
        .map_err(|e| CliError::failure(format!("Error writing case list: {}", e)))?;

    Ok(ExitCode::SUCCESS)
}

/// One line per case, then a count line. Returns the number of skipped cases.
fn write_case_list(out: &mut impl Write, manifest: &ValidationManifest, skips: &SkipSet) -> io::Result<usize> {
    let mut skipped = 0;
    for module in manifest.modules() {
        for entry in &module.entries {
            let case = CaseId::new(&module.module, &entry.name);
            if skips.is_skipped(&module.module, &entry.name) {
                skipped += 1;
                match skips.reason(&module.module, &entry.name) {
                    Some(reason) => writeln!(out, "{}  [skipped: {}]", case, reason)?,
                    None => writeln!(out, "{}  [skipped]", case)?,
                }
            } else {
                writeln!(out, "{}", case)?;
            }
        }
    }
    writeln!(
        out,
        "{} cases in {} modules, {} skipped",
        manifest.total_entries(),
        manifest.modules().len(),
        skipped
    )?;
    Ok(skipped)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wasmval_core::SkipKey;

    use super::*;

    const MANIFEST: &str = r#"[
        { "module": "basicMath", "entries": [
            { "name": "add", "args": [2, 3], "result": "5" },
            { "name": "sub", "args": [5, 3], "result": "2" }
        ] },
        { "module": "rec_types", "entries": [
            { "name": "recursiveType1", "args": [], "result": "ref.struct" }
        ] }
    ]"#;

    #[test]
    fn test_case_list_marks_skips() {
        let manifest = ValidationManifest::from_json(MANIFEST).unwrap();
        let mut skips = SkipSet::new();
        skips.insert(SkipKey::module("rec_types"), Some("recursive types".to_string()));
        skips.insert(SkipKey::entry("basicMath", "sub"), None);

        let mut out = Vec::new();
        let skipped = write_case_list(&mut out, &manifest, &skips).unwrap();

        assert_eq!(skipped, 2);
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        basicMath:add
        basicMath:sub  [skipped]
        rec_types:recursiveType1  [skipped: recursive types]
        3 cases in 2 modules, 2 skipped
        ");
    }
}
