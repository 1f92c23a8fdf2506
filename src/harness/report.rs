//! Report sink: the run log and the summary counters.
//!
//! The log is rewritten from scratch every run. It starts with a timestamped header and then holds one framed
//! record per non-passing case, in manifest order:
//!
//! ```text
//! ===================================================================================
//! Running [basicMath:add] get invalid return code: 2 (expected 0)
//! stdout:
//! ...
//! -----------------------------------------------------------------------------------
//! source code:
//!     tests/samples/basicMath.ts
//! wasm module:
//!     wasm_modules/basicMath.wasm
//! reproduce cmd:
//!     iwasm_gc -f add wasm_modules/basicMath.wasm 2 3
//! ===================================================================================
//! ```

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use wasmval_core::{CaseId, ExecutionResult, RunSummary, Verdict};

use super::runtime::Invocation;

const RECORD_RULE: &str = "===================================================================================";
const RECORD_DIVIDER: &str = "-----------------------------------------------------------------------------------";
const SUMMARY_DIVIDER: &str = "-------------------------------------------------------------";

/// Everything known about one judged entry.
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub case: CaseId,
    pub verdict: Verdict,
    pub source: PathBuf,
    /// Set once the module compiled
    pub artifact: Option<PathBuf>,
    /// Set once the runtime was invoked
    pub invocation: Option<Invocation>,
    pub execution: Option<ExecutionResult>,
}

impl EntryReport {
    /// A report for a case that never reached the runtime.
    pub fn without_execution(case: CaseId, verdict: Verdict, source: PathBuf) -> Self {
        Self {
            case,
            verdict,
            source,
            artifact: None,
            invocation: None,
            execution: None,
        }
    }
}

/// All entry reports of one module, in manifest order.
#[derive(Debug, Clone)]
pub struct ModuleReport {
    pub module: String,
    pub entries: Vec<EntryReport>,
}

/// Append-only writer for the run log, owning the run's [`RunSummary`].
pub struct ReportSink<W: Write> {
    writer: W,
    summary: RunSummary,
}

impl ReportSink<BufWriter<File>> {
    /// Truncate (or create) the log file and write the header.
    pub fn create(path: &Path, timestamp: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut sink = ReportSink::new(BufWriter::new(File::create(path)?));
        sink.write_header(timestamp)?;
        Ok(sink)
    }
}

impl<W: Write> ReportSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            summary: RunSummary::new(),
        }
    }

    pub fn write_header(&mut self, timestamp: &str) -> io::Result<()> {
        writeln!(self.writer, "Start validation on WAMR ... {}", timestamp)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    /// Count the verdict and, unless it passed, append its record.
    pub fn record(&mut self, report: &EntryReport) -> io::Result<()> {
        self.summary.record(&report.verdict);
        if let Some(record) = render_record(report) {
            self.writer.write_all(record.as_bytes())?;
            self.writer.flush()?;
        }
        Ok(())
    }

    pub fn record_module(&mut self, report: &ModuleReport) -> io::Result<()> {
        for entry in &report.entries {
            self.record(entry)?;
        }
        Ok(())
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Flush and hand back the summary and writer.
    pub fn finish(mut self) -> io::Result<(RunSummary, W)> {
        self.writer.flush()?;
        Ok((self.summary, self.writer))
    }
}

/// The framed log record for a case, or `None` for a pass.
pub fn render_record(report: &EntryReport) -> Option<String> {
    let case = &report.case;
    let mut out = String::new();
    let _ = writeln!(out, "{}", RECORD_RULE);

    match &report.verdict {
        Verdict::Pass => return None,
        Verdict::Skipped { reason } => {
            let _ = writeln!(out, "[{}] skipped", case);
            if let Some(reason) = reason {
                let _ = writeln!(out, "\treason: {}", reason);
            }
        }
        Verdict::CompileFailed => {
            let _ = writeln!(out, "Running [{}] failed due to compilation error", case);
        }
        Verdict::ReturnCodeMismatch { expected, actual } => {
            let actual = actual.map_or_else(|| "none".to_string(), |code| code.to_string());
            let _ = writeln!(
                out,
                "Running [{}] get invalid return code: {} (expected {})",
                case, actual, expected
            );
            push_streams(&mut out, report.execution.as_ref());
        }
        Verdict::Timeout { after } => {
            let _ = writeln!(out, "Running [{}] timed out after {:.1}s", case, after.as_secs_f64());
            push_streams(&mut out, report.execution.as_ref());
        }
        Verdict::OutputMismatch {
            expected,
            actual,
            needs_manual_review,
        } => {
            let _ = writeln!(out, "Running [{}] get unexpected output", case);
            let _ = writeln!(out, "\tExpected: {}", expected);
            let _ = writeln!(out, "\tGot: {}", actual);
            if *needs_manual_review {
                let _ = writeln!(out, "\tNeeds manual validation (reference-typed result)");
            }
        }
    }

    let _ = writeln!(out, "{}", RECORD_DIVIDER);
    let _ = writeln!(out, "source code:\n\t{}", report.source.display());
    if let Some(artifact) = &report.artifact {
        let _ = writeln!(out, "wasm module:\n\t{}", artifact.display());
    }
    if let Some(invocation) = &report.invocation {
        let _ = writeln!(out, "reproduce cmd:\n\t{}", invocation);
    }
    let _ = writeln!(out, "{}", RECORD_RULE);
    out.push_str("\n\n");
    Some(out)
}

fn push_streams(out: &mut String, execution: Option<&ExecutionResult>) {
    let (stdout, stderr) = execution
        .map(|e| (e.stdout_text(), e.stderr_text()))
        .unwrap_or_default();
    for (label, text) in [("stdout", stdout), ("stderr", stderr)] {
        let _ = writeln!(out, "{}:", label);
        out.push_str(&text);
        if !text.is_empty() && !text.ends_with('\n') {
            out.push('\n');
        }
    }
}

/// Console summary printed at the end of a run.
pub fn render_summary(summary: &RunSummary, elapsed: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} / {} passed!", summary.passed, summary.judged());
    let _ = writeln!(out, "{}", SUMMARY_DIVIDER);
    let _ = writeln!(out, "In the {} failed cases:", summary.failed);
    let _ = writeln!(out, "    * {} cases failed due to compilation error", summary.compile_failed);
    let _ = writeln!(out, "    * {} cases got an unexpected return code", summary.return_code_mismatch);
    let _ = writeln!(out, "    * {} cases got unexpected output", summary.output_mismatch);
    let _ = writeln!(
        out,
        "    * {} cases need manual validation due to complex return type",
        summary.needs_manual_review
    );
    let _ = writeln!(out, "    * {} cases timed out", summary.timed_out);
    let _ = writeln!(out, "{}", SUMMARY_DIVIDER);
    let _ = writeln!(out, "    * {} cases skipped", summary.skipped);
    let _ = write!(out, "finished in {:.2}s", elapsed.as_secs_f64());
    out
}
