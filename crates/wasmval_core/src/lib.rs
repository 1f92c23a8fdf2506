//! Provide the shared vocabulary of the wasmval validation harness.
//!
//! This crate holds the data the harness reasons about and the pure decisions it makes over that data:
//! - the validation manifest (`ModuleCase` / `EntryCase`) and its loader,
//! - skip keys and the skip set,
//! - execution results, compilation outcomes, verdicts, and the classification rule,
//! - the per-run summary counters.
//!
//! ## Notes
//!
//! - No process spawning and no filesystem writes. Manifest and skip-list parsing read from `&str`; the harness
//!   crate owns all I/O.
//! - Everything here is deterministic so the classifier can be property-tested in isolation.

pub mod manifest;
pub mod skip;
pub mod summary;
pub mod verdict;

pub use manifest::{ArgValue, EntryCase, ManifestError, ModuleCase, ValidationManifest};
pub use skip::{SkipEntry, SkipKey, SkipListError, SkipSet};
pub use summary::RunSummary;
pub use verdict::{CaseId, CompilationOutcome, ExecutionResult, Verdict, VerdictKind, classify};
