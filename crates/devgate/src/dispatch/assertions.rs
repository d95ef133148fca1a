//! Assertion discipline: a test that ran to completion without asserting
//! anything is a failure, not a pass.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-test assertion tally, bumped by the engine's `expect` hook.
#[derive(Debug, Default)]
pub struct AssertionCounter {
    count: AtomicUsize,
}

impl AssertionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

/// What the engine reports for one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestReport {
    pub name: String,
    pub status: TestStatus,
    pub assertions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// The test body itself failed
    TestFailed,
    /// The test finished without a single assertion
    NoAssertions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Skipped,
    Failed(FailureReason),
}

impl Verdict {
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssertionPolicy {
    pub require_assertions: bool,
}

impl Default for AssertionPolicy {
    fn default() -> Self {
        Self {
            require_assertions: true,
        }
    }
}

impl AssertionPolicy {
    pub fn evaluate(&self, report: &TestReport) -> Verdict {
        match report.status {
            TestStatus::Skipped => Verdict::Skipped,
            TestStatus::Failed => Verdict::Failed(FailureReason::TestFailed),
            TestStatus::Passed if self.require_assertions && report.assertions == 0 => {
                Verdict::Failed(FailureReason::NoAssertions)
            }
            TestStatus::Passed => Verdict::Passed,
        }
    }
}
