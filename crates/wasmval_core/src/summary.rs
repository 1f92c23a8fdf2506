//! Per-run counters.

use std::ops::AddAssign;

use crate::verdict::{Verdict, VerdictKind};

/// Aggregate counts for one harness invocation.
///
/// Every verdict is recorded exactly once, so `passed + failed + skipped == total` always holds, with
/// `failed` being the sum of the four failure kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub compile_failed: usize,
    pub return_code_mismatch: usize,
    pub output_mismatch: usize,
    pub timed_out: usize,
    /// Subset of `output_mismatch` flagged for a human to inspect
    pub needs_manual_review: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        match verdict.kind() {
            VerdictKind::Pass => self.passed += 1,
            VerdictKind::Skipped => self.skipped += 1,
            VerdictKind::CompileFailed => self.compile_failed += 1,
            VerdictKind::Timeout => self.timed_out += 1,
            VerdictKind::ReturnCodeMismatch => self.return_code_mismatch += 1,
            VerdictKind::OutputMismatch => self.output_mismatch += 1,
        }
        if verdict.is_failure() {
            self.failed += 1;
        }
        if verdict.needs_manual_review() {
            self.needs_manual_review += 1;
        }
    }

    /// Cases that were judged rather than skipped.
    pub fn judged(&self) -> usize {
        self.total - self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit code for CI: `0` when nothing failed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.compile_failed += other.compile_failed;
        self.return_code_mismatch += other.return_code_mismatch;
        self.output_mismatch += other.output_mismatch;
        self.timed_out += other.timed_out;
        self.needs_manual_review += other.needs_manual_review;
        self.skipped += other.skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_summary_succeeds() {
        let summary = RunSummary::new();
        assert!(summary.is_success());
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_skips_do_not_fail_the_run() {
        let mut summary = RunSummary::new();
        summary.record(&Verdict::Pass);
        summary.record(&Verdict::Skipped { reason: None });
        assert_eq!(summary.total, 2);
        assert_eq!(summary.judged(), 1);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_failure_kinds_all_count_as_failed() {
        let mut summary = RunSummary::new();
        summary.record(&Verdict::CompileFailed);
        summary.record(&Verdict::CompileFailed);
        summary.record(&Verdict::ReturnCodeMismatch {
            expected: 0,
            actual: Some(2),
        });
        summary.record(&Verdict::Timeout {
            after: Duration::from_secs(1),
        });
        summary.record(&Verdict::OutputMismatch {
            expected: "ref#1".into(),
            actual: "ref#3".into(),
            needs_manual_review: true,
        });

        assert_eq!(summary.failed, 5);
        assert_eq!(summary.compile_failed, 2);
        assert_eq!(summary.return_code_mismatch, 1);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.output_mismatch, 1);
        assert_eq!(summary.needs_manual_review, 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_add_assign_merges_counts() {
        let mut a = RunSummary::new();
        a.record(&Verdict::Pass);
        let mut b = RunSummary::new();
        b.record(&Verdict::CompileFailed);
        b.record(&Verdict::Skipped { reason: None });

        a += b;
        assert_eq!(a.total, 3);
        assert_eq!(a.passed + a.failed + a.skipped, a.total);
    }
}
