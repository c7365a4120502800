//! Per-test result records.
//!
//! A client reports one [`TestResult`] per finished test. The record is
//! immutable once reported; the aggregator never revises it. The
//! [`AssertionResult::full_name`] (ancestor titles joined with the test
//! title) is the identity key used to reconcile the same logical test
//! across clients.

use serde::{Deserialize, Serialize};

/// Outcome class of a single assertion/test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionStatus {
    Passed,
    Failed,
    /// Skipped via `it.skip` or focus filtering. The wire form may also be
    /// the legacy `"pending"` spelling.
    #[serde(alias = "pending")]
    Skipped,
    Todo,
}

impl AssertionStatus {
    /// Label used when printing skipped/todo test lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Todo => "todo",
        }
    }
}

/// The assertion-level view of a finished test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    /// Test title (the innermost `it(...)` description).
    pub title: String,
    /// Join of ancestor suite titles plus the test title. Identity key for
    /// cross-client reconciliation.
    pub full_name: String,
    /// Titles of enclosing describe blocks, outermost first.
    pub ancestor_titles: Vec<String>,
    pub status: AssertionStatus,
    /// Wall-clock duration in milliseconds, when the client measured one.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Raw failure messages; cleaned through the error processor before
    /// printing.
    #[serde(default)]
    pub failure_messages: Vec<String>,
}

/// A finished test as reported by one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub description: String,
    /// Ancestor suite titles, outermost first.
    pub suite: Vec<String>,
    /// Execution time in milliseconds.
    pub time: f64,
    pub failed: bool,
    pub not_run: bool,
    pub success: bool,
    /// Errors raised outside the assertion itself (hooks, async leaks).
    #[serde(default)]
    pub errors: Vec<String>,
    pub assertion_result: AssertionResult,
    /// Source file of the root suite this test belongs to.
    pub test_file_path: String,
}

impl TestResult {
    /// Whether this result should appear in the failure report.
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.failed || self.assertion_result.status == AssertionStatus::Failed
    }
}
