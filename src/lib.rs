#![forbid(unsafe_code)]
//! wasmval: differential validation harness for a TypeScript to WebAssembly compiler
//!
//! For every module listed in a validation manifest the harness compiles the sample source once, runs each
//! listed entry function in a WebAssembly runtime, compares exit code and trimmed stdout against the expected
//! values, and writes a log of every non-passing case plus a console summary.
//!
//! The shared vocabulary (manifest, skip keys, verdicts, counters) lives in `wasmval_core` and is re-exported
//! here.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod harness;
pub mod version;

pub use wasmval_core::{
    ArgValue, CaseId, CompilationOutcome, EntryCase, ExecutionResult, ModuleCase, RunSummary, SkipKey, SkipSet,
    ValidationManifest, Verdict, VerdictKind, classify,
};

pub use harness::{HarnessConfig, HarnessError, RunController};
