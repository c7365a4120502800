//! Final run summary text.
//!
//! Produces the `Test Suites:` / `Tests:` / `Snapshots:` / `Time:` block,
//! with non-zero outcome classes color coded. Snapshot figures come from a
//! [`MergedSnapshotSummary`], the cross-client combination of each client's
//! per-run snapshot summary.

use std::path::PathBuf;
use std::time::Duration;

use crate::style::{bold, green, magenta, red, yellow};

/// Cross-client combination of snapshot summaries. Counters are summed and
/// list fields concatenated; snapshot *files* are never merged across
/// clients (each keeps its own partition).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSnapshotSummary {
    pub did_update: bool,
    pub total: u32,
    pub added: u32,
    pub matched: u32,
    pub updated: u32,
    pub unmatched: u32,
    pub unchecked: u32,
    pub files_added: u32,
    pub files_removed: u32,
    /// Removed suite files, resolved through the client-aware resolver.
    pub files_removed_list: Vec<PathBuf>,
    /// Obsolete snapshot keys per resolved file path.
    pub unchecked_keys_by_file: Vec<(PathBuf, Vec<String>)>,
}

/// Inputs for the counts block.
#[derive(Debug, Clone, Default)]
pub struct SummaryCounts {
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub tests_skipped: usize,
    pub tests_todo: usize,
    pub tests_total: usize,
    pub suites_passed: usize,
    pub suites_failed: usize,
    pub suites_total: usize,
}

fn count_parts(
    failed: usize,
    skipped: usize,
    todo: usize,
    passed: usize,
    total: usize,
) -> String {
    let mut parts = Vec::new();
    if failed > 0 {
        parts.push(bold(&red(&format!("{failed} failed"))));
    }
    if skipped > 0 {
        parts.push(bold(&yellow(&format!("{skipped} skipped"))));
    }
    if todo > 0 {
        parts.push(bold(&magenta(&format!("{todo} todo"))));
    }
    if passed > 0 {
        parts.push(bold(&green(&format!("{passed} passed"))));
    }
    parts.push(format!("{total} total"));
    parts.join(", ")
}

fn snapshot_parts(snapshot: Option<&MergedSnapshotSummary>) -> String {
    let Some(snap) = snapshot else {
        return "0 total".to_string();
    };

    let mut parts = Vec::new();
    if snap.unmatched > 0 {
        parts.push(bold(&red(&format!("{} failed", snap.unmatched))));
    }
    if snap.updated > 0 {
        parts.push(bold(&green(&format!("{} updated", snap.updated))));
    }
    if snap.added > 0 {
        parts.push(bold(&green(&format!("{} written", snap.added))));
    }
    if snap.unchecked > 0 {
        parts.push(bold(&yellow(&format!("{} obsolete", snap.unchecked))));
    }
    if snap.matched > 0 {
        parts.push(format!("{} passed", snap.matched));
    }
    parts.push(format!("{} total", snap.total));
    parts.join(", ")
}

/// Render the four-line counts block.
#[must_use]
pub fn render_summary(
    counts: &SummaryCounts,
    snapshot: Option<&MergedSnapshotSummary>,
    elapsed: Duration,
) -> String {
    let suites = count_parts(
        counts.suites_failed,
        0,
        0,
        counts.suites_passed,
        counts.suites_total,
    );
    let tests = count_parts(
        counts.tests_failed,
        counts.tests_skipped,
        counts.tests_todo,
        counts.tests_passed,
        counts.tests_total,
    );

    format!(
        "{} {suites}\n{} {tests}\n{} {}\n{} {:.3} s",
        bold("Test Suites:"),
        bold("Tests:      "),
        bold("Snapshots:  "),
        snapshot_parts(snapshot),
        bold("Time:       "),
        elapsed.as_secs_f64(),
    )
}

pub(crate) fn pluralize(word: &str, count: u32) -> String {
    if count == 1 { format!("{count} {word}") } else { format!("{count} {word}s") }
}
