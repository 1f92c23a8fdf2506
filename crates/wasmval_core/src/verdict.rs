//! Verdicts and the classification rule that produces them.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::manifest::EntryCase;
use crate::skip::SkipSet;

/// Substring marking stdout that prints a reference-typed value, which is not textually comparable.
pub const MANUAL_REVIEW_MARKER: &str = "ref";

/// Fully-qualified case identifier, displayed as `module:entry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseId {
    pub module: String,
    pub entry: String,
}

impl CaseId {
    pub fn new(module: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entry: entry.into(),
        }
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.entry)
    }
}

/// Result of compiling one module. Computed once and shared by the module's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationOutcome {
    Compiled { artifact: PathBuf },
    Failed,
}

impl CompilationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, CompilationOutcome::Compiled { .. })
    }

    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            CompilationOutcome::Compiled { artifact } => Some(artifact),
            CompilationOutcome::Failed => None,
        }
    }
}

/// Captured output of one runtime invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the process was killed by a signal (including on timeout)
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ExecutionResult {
    /// A normally-exited process with the given code and stdout.
    pub fn exited(exit_code: i32, stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stdout with surrounding whitespace removed, as compared against the manifest.
    pub fn trimmed_stdout(&self) -> String {
        self.stdout_text().trim().to_string()
    }
}

/// Outcome for one entry in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Skipped {
        reason: Option<String>,
    },
    CompileFailed,
    Timeout {
        after: Duration,
    },
    ReturnCodeMismatch {
        expected: i32,
        actual: Option<i32>,
    },
    OutputMismatch {
        expected: String,
        actual: String,
        needs_manual_review: bool,
    },
}

/// Fieldless discriminant of [`Verdict`], for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerdictKind {
    Pass,
    Skipped,
    CompileFailed,
    Timeout,
    ReturnCodeMismatch,
    OutputMismatch,
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Verdict::Pass => VerdictKind::Pass,
            Verdict::Skipped { .. } => VerdictKind::Skipped,
            Verdict::CompileFailed => VerdictKind::CompileFailed,
            Verdict::Timeout { .. } => VerdictKind::Timeout,
            Verdict::ReturnCodeMismatch { .. } => VerdictKind::ReturnCodeMismatch,
            Verdict::OutputMismatch { .. } => VerdictKind::OutputMismatch,
        }
    }

    /// Whether this verdict fails the run.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Verdict::Pass | Verdict::Skipped { .. })
    }

    pub fn needs_manual_review(&self) -> bool {
        matches!(
            self,
            Verdict::OutputMismatch {
                needs_manual_review: true,
                ..
            }
        )
    }
}

/// Judge one entry. The first matching rule wins:
///
/// 1. skip set contains the entry → `Skipped`
/// 2. module did not compile → `CompileFailed`
/// 3. runtime was killed on timeout → `Timeout`
/// 4. exit code differs from `entry.ret` → `ReturnCodeMismatch`
/// 5. trimmed stdout differs from `entry.result` → `OutputMismatch`
/// 6. otherwise → `Pass`
///
/// A missing execution result after a successful compile means the runtime never produced an exit code and is
/// judged as a return code mismatch.
pub fn classify(
    module: &str,
    entry: &EntryCase,
    skips: &SkipSet,
    compilation: Option<&CompilationOutcome>,
    execution: Option<&ExecutionResult>,
) -> Verdict {
    if skips.is_skipped(module, &entry.name) {
        return Verdict::Skipped {
            reason: skips.reason(module, &entry.name).map(str::to_string),
        };
    }

    if !compilation.is_some_and(CompilationOutcome::succeeded) {
        return Verdict::CompileFailed;
    }

    let Some(execution) = execution else {
        return Verdict::ReturnCodeMismatch {
            expected: entry.ret,
            actual: None,
        };
    };

    if execution.timed_out {
        return Verdict::Timeout {
            after: execution.duration,
        };
    }

    if execution.exit_code != Some(entry.ret) {
        return Verdict::ReturnCodeMismatch {
            expected: entry.ret,
            actual: execution.exit_code,
        };
    }

    let actual = execution.trimmed_stdout();
    if actual != entry.result {
        let needs_manual_review = actual.contains(MANUAL_REVIEW_MARKER);
        return Verdict::OutputMismatch {
            expected: entry.result.clone(),
            actual,
            needs_manual_review,
        };
    }

    Verdict::Pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::SkipKey;

    fn entry(result: &str, ret: i32) -> EntryCase {
        EntryCase {
            name: "add".into(),
            args: Vec::new(),
            result: result.into(),
            ret,
        }
    }

    fn compiled() -> CompilationOutcome {
        CompilationOutcome::Compiled {
            artifact: PathBuf::from("basicMath.wasm"),
        }
    }

    #[test]
    fn test_pass_with_trailing_newline() {
        let exec = ExecutionResult::exited(0, "5\n");
        let verdict = classify("basicMath", &entry("5", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn test_return_code_mismatch() {
        let exec = ExecutionResult::exited(2, "5\n");
        let verdict = classify("basicMath", &entry("5", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(
            verdict,
            Verdict::ReturnCodeMismatch {
                expected: 0,
                actual: Some(2)
            }
        );
    }

    #[test]
    fn test_return_code_checked_before_output() {
        // stdout matches but the exit code does not
        let exec = ExecutionResult::exited(1, "5");
        let verdict = classify("basicMath", &entry("5", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(verdict.kind(), VerdictKind::ReturnCodeMismatch);
    }

    #[test]
    fn test_expected_nonzero_return_code() {
        let exec = ExecutionResult::exited(1, "");
        let verdict = classify("m", &entry("", 1), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn test_skip_wins_over_everything() {
        let skips: SkipSet = [SkipKey::entry("basicMath", "add")].into_iter().collect();
        let verdict = classify("basicMath", &entry("5", 0), &skips, Some(&CompilationOutcome::Failed), None);
        assert_eq!(verdict, Verdict::Skipped { reason: None });
        assert!(!verdict.is_failure());
    }

    #[test]
    fn test_compile_failure() {
        let verdict = classify("m", &entry("5", 0), &SkipSet::new(), Some(&CompilationOutcome::Failed), None);
        assert_eq!(verdict, Verdict::CompileFailed);
        assert!(verdict.is_failure());
    }

    #[test]
    fn test_missing_execution_is_return_code_mismatch() {
        let verdict = classify("m", &entry("5", 0), &SkipSet::new(), Some(&compiled()), None);
        assert_eq!(
            verdict,
            Verdict::ReturnCodeMismatch {
                expected: 0,
                actual: None
            }
        );
    }

    #[test]
    fn test_timeout_wins_over_exit_code() {
        let exec = ExecutionResult {
            exit_code: None,
            timed_out: true,
            duration: Duration::from_secs(3),
            ..ExecutionResult::default()
        };
        let verdict = classify("m", &entry("5", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(
            verdict,
            Verdict::Timeout {
                after: Duration::from_secs(3)
            }
        );
    }

    #[test]
    fn test_output_mismatch_with_ref_needs_manual_review() {
        let exec = ExecutionResult::exited(0, "ref#3\n");
        let verdict = classify("m", &entry("ref#1", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(
            verdict,
            Verdict::OutputMismatch {
                expected: "ref#1".into(),
                actual: "ref#3".into(),
                needs_manual_review: true
            }
        );
    }

    #[test]
    fn test_output_mismatch_without_ref_is_not_flagged() {
        let exec = ExecutionResult::exited(0, "6");
        let verdict = classify("m", &entry("5", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert_eq!(verdict.kind(), VerdictKind::OutputMismatch);
        assert!(!verdict.needs_manual_review());
    }

    #[test]
    fn test_ref_at_start_of_output_is_flagged() {
        let exec = ExecutionResult::exited(0, "ref");
        let verdict = classify("m", &entry("x", 0), &SkipSet::new(), Some(&compiled()), Some(&exec));
        assert!(verdict.needs_manual_review());
    }

    #[test]
    fn test_case_id_display() {
        assert_eq!(CaseId::new("basicMath", "add").to_string(), "basicMath:add");
    }
}
