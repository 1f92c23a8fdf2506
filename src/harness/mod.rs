//! The validation pipeline: compile each module, run each entry, classify, report.
//!
//! ## Modules
//!
//! - `config` - paths, timeouts, parallelism
//! - `compiler` - compiler driver (`Compiler` trait, command and in-process implementations)
//! - `runtime` - runtime invoker (`Runtime` trait, process implementation, runtime build step)
//! - `process` - subprocess capture with timeouts
//! - `report` - run log and console summary
//! - `controller` - the run loop
//!
//! ## Errors
//!
//! Only [`HarnessError`] escapes a run, and only for problems that make the whole run meaningless (bad manifest,
//! missing runtime, unwritable log). Per-case problems become verdicts.

pub mod compiler;
pub mod config;
pub mod controller;
pub mod process;
pub mod report;
pub mod runtime;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use wasmval_core::{ManifestError, SkipKey, SkipListError, SkipSet, ValidationManifest};

pub use compiler::{Backend, CommandCompiler, CompileError, Compiler, Frontend, PipelineCompiler};
pub use config::{CompilerConfig, HarnessConfig};
pub use controller::RunController;
pub use report::{EntryReport, ModuleReport, ReportSink};
pub use runtime::{Invocation, ProcessRuntime, Runtime, RuntimeBuildError};

/// Errors that abort a validation run.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("cannot read manifest {path}")]
    #[diagnostic(code(wasmval::manifest::read), help("pass --manifest or --root to point at validation.json"))]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest {path}")]
    #[diagnostic(
        code(wasmval::manifest::invalid),
        help("each item needs `module` and `entries`; each entry needs `name`, `args` and `result`")
    )]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("cannot read skip list {path}")]
    #[diagnostic(code(wasmval::skip_list::read))]
    SkipListRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid skip list {path}")]
    #[diagnostic(
        code(wasmval::skip_list::invalid),
        help("expected a JSON array of {{ \"module\": .., \"entry\"?: .., \"reason\"?: .. }}")
    )]
    SkipList {
        path: PathBuf,
        #[source]
        source: SkipListError,
    },

    #[error(transparent)]
    #[diagnostic(code(wasmval::runtime::build), help("build the runtime manually or pass --runtime"))]
    RuntimeBuild(#[from] RuntimeBuildError),

    #[error("cannot prepare output directory {path}")]
    #[diagnostic(code(wasmval::io::output_dir))]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write log file {path}")]
    #[diagnostic(code(wasmval::io::log))]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start the worker pool")]
    #[diagnostic(code(wasmval::workers::start))]
    WorkerPool(#[source] io::Error),

    #[error("a module worker panicked")]
    #[diagnostic(code(wasmval::workers::panic))]
    Worker(#[from] tokio::task::JoinError),
}

/// Read and validate the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<ValidationManifest, HarnessError> {
    let source = fs::read_to_string(path).map_err(|source| HarnessError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    ValidationManifest::from_json(&source).map_err(|source| HarnessError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the skip set from an optional skip-list file plus keys given on the command line.
pub fn load_skip_set(skip_list: Option<&Path>, extra: &[SkipKey]) -> Result<SkipSet, HarnessError> {
    let mut skips = match skip_list {
        Some(path) => {
            let source = fs::read_to_string(path).map_err(|source| HarnessError::SkipListRead {
                path: path.to_path_buf(),
                source,
            })?;
            SkipSet::from_json(&source).map_err(|source| HarnessError::SkipList {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => SkipSet::new(),
    };
    skips.extend(extra.iter().cloned().collect());
    Ok(skips)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_manifest_is_fatal() {
        let err = load_manifest(Path::new("/nonexistent/validation.json")).unwrap_err();
        assert!(matches!(err, HarnessError::ManifestRead { .. }));
    }

    #[test]
    fn test_corrupt_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation.json");
        fs::write(&path, r#"[{ "module": "m", "entries": [{ "name": "f" }] }]"#).unwrap();
        let err = load_manifest(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Manifest { .. }));
    }

    #[test]
    fn test_skip_set_merges_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skip.json");
        fs::write(&path, r#"[{ "module": "rec_types", "entry": "recursiveType1", "reason": "recursive types" }]"#)
            .unwrap();

        let skips = load_skip_set(Some(&path), &[SkipKey::module("declare_func")]).unwrap();
        assert!(skips.is_skipped("rec_types", "recursiveType1"));
        assert!(skips.is_skipped("declare_func", "anything"));
        assert_eq!(skips.len(), 2);
    }

    #[test]
    fn test_shipped_skip_list_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join("skip_list.json");
        let skips = load_skip_set(Some(&path), &[]).unwrap();
        assert!(skips.is_skipped("exception_throw_error", "anyEntry"));
        assert!(skips.is_skipped("any_box_null", "boxNull"));
        assert!(!skips.is_skipped("any_box_null", "other"));
    }
}
