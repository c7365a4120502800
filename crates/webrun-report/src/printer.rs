//! Cross-client result aggregation and incremental terminal output.
//!
//! The printer owns the canonical view of one run across N concurrently
//! reporting clients: the suite tree, per-client completion bookkeeping,
//! and the summary counters. All mutation happens on a single logical
//! thread of control; "concurrency" is only the unordered interleaving of
//! client messages, so no locking is needed. The one internal fan-out is
//! failure-message cleanup, which runs on scoped worker threads and is
//! reassembled in original result order before anything is printed.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use webrun_core::{AssertionResult, AssertionStatus, LogEntry, LogKind, TestResult};
use webrun_snapshot::SnapshotSummary;

use crate::status::{StatusFrame, StatusRenderer};
use crate::style::{bold, dim, green, inverse, magenta, red, white, yellow};
use crate::summary::{MergedSnapshotSummary, SummaryCounts, pluralize, render_summary};

const ARROW: &str = " \u{203a} ";

const CLEAR_SCREEN: &str =
    if cfg!(windows) { "\x1B[2J\x1B[0f" } else { "\x1B[2J\x1B[3J\x1B[H" };

/// Asynchronous stack/source-map cleanup collaborator. Implementations are
/// called from scoped worker threads, so they must be `Sync`.
pub trait ErrorProcessor: Sync {
    fn process(&self, raw: &str) -> String;
}

/// Identity processor for hosts without source-map support.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughErrors;

impl ErrorProcessor for PassthroughErrors {
    fn process(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Display state of a root suite in the status area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuiteBadge {
    Pass,
    Fail,
    Running,
}

fn status_icon(status: AssertionStatus) -> String {
    match status {
        AssertionStatus::Failed => red(if cfg!(windows) { "\u{d7}" } else { "\u{2715}" }),
        AssertionStatus::Skipped => yellow("\u{25cb}"),
        AssertionStatus::Todo => magenta("\u{270e}"),
        AssertionStatus::Passed => green(if cfg!(windows) { "\u{221a}" } else { "\u{2713}" }),
    }
}

/// A `(root suite, client)` pair in the completion bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SuiteClient {
    suite: String,
    client: String,
}

fn suite_key(suite: &str, client: &str) -> String {
    format!("{suite}--{client}")
}

#[derive(Debug)]
struct PrintedTest {
    result: AssertionResult,
    printed: bool,
}

/// One node of the aggregator's suite tree, rooted at an empty-title
/// sentinel. The explicit `printed` flags make repeated traversal
/// idempotent without relying on object identity.
#[derive(Debug, Default)]
struct SuiteNode {
    title: String,
    tests: Vec<PrintedTest>,
    suites: Vec<SuiteNode>,
    printed: bool,
}

/// A suite is complete iff every contained test has been reported by all
/// expected clients and every child suite is complete.
fn suite_complete(node: &SuiteNode, test_count: &BTreeMap<String, usize>, quorum: usize) -> bool {
    node.tests
        .iter()
        .all(|t| test_count.get(&t.result.full_name).copied() == Some(quorum))
        && node.suites.iter().all(|s| suite_complete(s, test_count, quorum))
}

fn insert_result(root: &mut SuiteNode, result: &AssertionResult) {
    let mut node = root;
    for title in &result.ancestor_titles {
        let idx = match node.suites.iter().position(|s| s.title == *title) {
            Some(idx) => idx,
            None => {
                node.suites.push(SuiteNode { title: title.clone(), ..SuiteNode::default() });
                node.suites.len() - 1
            }
        };
        node = &mut node.suites[idx];
    }
    node.tests.push(PrintedTest { result: result.clone(), printed: false });
}

fn push_line(out: &mut String, text: &str, indent: usize) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(text);
    out.push('\n');
}

struct TreeCtx<'a> {
    test_count: &'a BTreeMap<String, usize>,
    quorum: usize,
    verbose: bool,
}

fn render_test(test: &mut PrintedTest, indent: usize, out: &mut String) {
    if test.printed {
        return;
    }
    let time = test.result.duration.map(|d| format!(" ({d:.0}ms)")).unwrap_or_default();
    let text = format!("{}{time}", test.result.title);
    push_line(out, &format!("{} {}", status_icon(test.result.status), dim(&text)), indent);
    test.printed = true;
}

fn render_skipped_or_todo(test: &mut PrintedTest, indent: usize, out: &mut String) {
    let text = dim(&format!("{} {}", test.result.status.label(), test.result.title));
    push_line(out, &format!("{} {text}", status_icon(test.result.status)), indent);
    test.printed = true;
}

fn render_tests(tests: &mut [PrintedTest], ctx: &TreeCtx<'_>, indent: usize, out: &mut String) {
    if ctx.verbose {
        for test in tests.iter_mut() {
            render_test(test, indent, out);
        }
        return;
    }

    // Non-verbose: pass/fail lines print inline, skipped and todo lines
    // are grouped after them.
    let mut deferred = Vec::new();
    for (idx, test) in tests.iter_mut().enumerate() {
        if test.printed {
            continue;
        }
        match test.result.status {
            AssertionStatus::Skipped | AssertionStatus::Todo => deferred.push(idx),
            _ => render_test(test, indent, out),
        }
    }
    for idx in deferred {
        render_skipped_or_todo(&mut tests[idx], indent, out);
    }
}

fn render_suite(node: &mut SuiteNode, ctx: &TreeCtx<'_>, indent: usize, out: &mut String) {
    if !suite_complete(node, ctx.test_count, ctx.quorum) {
        return;
    }

    if !node.title.is_empty() && !node.printed {
        push_line(out, &node.title, indent);
        node.printed = true;
    }

    render_tests(&mut node.tests, ctx, indent + 1, out);

    for child in &mut node.suites {
        render_suite(child, ctx, indent + 1, out);
    }
}

/// Construction options for [`Printer`].
#[derive(Debug, Clone)]
pub struct PrinterOptions {
    pub verbose: bool,
    /// Number of clients expected to report every test.
    pub num_clients: usize,
    /// Terminal width in columns.
    pub width: usize,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self { verbose: false, num_clients: 1, width: 80 }
    }
}

/// The result aggregator and live reporter.
pub struct Printer<W: Write, P: ErrorProcessor> {
    out: W,
    process_error: P,
    verbose: bool,
    num_clients: usize,
    status: StatusRenderer,

    /// Per-fullName count of clients that have reported the test. Never
    /// exceeds `num_clients`; a test is resolved when it reaches it.
    test_count: BTreeMap<String, usize>,
    root: SuiteNode,

    num_passed_tests: usize,
    num_failed_tests: usize,
    num_skipped_tests: usize,
    num_todo_tests: usize,

    passed_suites: BTreeSet<String>,
    failed_suites: BTreeSet<String>,

    /// Disjoint `(suite, client)` maps; a pair's status is derived from
    /// membership, never from a flag that could drift.
    root_suites_running: BTreeMap<String, SuiteClient>,
    root_suites_done: BTreeMap<String, SuiteClient>,
    current_test_by_root_suite: BTreeMap<String, String>,

    results: Vec<TestResult>,
    logs: Vec<LogEntry>,

    num_estimated_total_tests: usize,
    start: Instant,

    /// Erase sequence for the status frame currently on screen.
    clear: String,
}

impl<W: Write, P: ErrorProcessor> Printer<W, P> {
    pub fn new(out: W, process_error: P, opts: PrinterOptions) -> Self {
        Self {
            out,
            process_error,
            verbose: opts.verbose,
            num_clients: opts.num_clients.max(1),
            status: StatusRenderer::new(opts.width),
            test_count: BTreeMap::new(),
            root: SuiteNode::default(),
            num_passed_tests: 0,
            num_failed_tests: 0,
            num_skipped_tests: 0,
            num_todo_tests: 0,
            passed_suites: BTreeSet::new(),
            failed_suites: BTreeSet::new(),
            root_suites_running: BTreeMap::new(),
            root_suites_done: BTreeMap::new(),
            current_test_by_root_suite: BTreeMap::new(),
            results: Vec::new(),
            logs: Vec::new(),
            num_estimated_total_tests: 0,
            start: Instant::now(),
            clear: String::new(),
        }
    }

    /// Reset every counter, the tree, and the completion maps for a new
    /// run. A stale message after `run_finished` is neutralized by the
    /// reset the next `run_start` performs.
    pub fn run_start(&mut self, num_estimated_total_tests: usize) {
        self.root = SuiteNode::default();
        self.test_count.clear();
        self.results.clear();
        self.logs.clear();

        self.num_estimated_total_tests = num_estimated_total_tests;
        self.num_passed_tests = 0;
        self.num_failed_tests = 0;
        self.num_skipped_tests = 0;
        self.num_todo_tests = 0;

        self.passed_suites.clear();
        self.failed_suites.clear();

        self.root_suites_running.clear();
        self.root_suites_done.clear();
        self.current_test_by_root_suite.clear();

        self.start = Instant::now();
        self.clear = String::new();

        info!(estimated = num_estimated_total_tests, clients = self.num_clients, "run started");
    }

    pub fn run_finished(&mut self) {
        info!(
            tests = self.results.len(),
            failed = self.num_failed_tests,
            "run finished"
        );
    }

    /// Clients may report their estimated totals after the host-level
    /// reset; the latest report wins.
    pub fn set_estimated_total(&mut self, total: usize) {
        self.num_estimated_total_tests = total;
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        self.clear = String::new();
        Ok(())
    }

    pub fn clear_status(&mut self) -> io::Result<()> {
        if self.clear.is_empty() {
            return Ok(());
        }
        let clear = std::mem::take(&mut self.clear);
        self.out.write_all(clear.as_bytes())
    }

    /// Mark a root suite as running for one client. A pair already in the
    /// done map is ignored: a client retry must not resurrect a finished
    /// suite.
    pub fn add_root_suite(&mut self, suite: &str, client: &str) -> io::Result<()> {
        let key = suite_key(suite, client);
        if self.root_suites_done.contains_key(&key) {
            return Ok(());
        }
        self.root_suites_running
            .insert(key, SuiteClient { suite: suite.to_string(), client: client.to_string() });
        self.print_status(true)
    }

    /// Move a `(suite, client)` pair from running to done. Duplicate or
    /// never-started signals are no-ops.
    pub fn root_suite_finished(&mut self, suite: &str, client: &str) -> io::Result<()> {
        let key = suite_key(suite, client);
        if self.root_suites_done.contains_key(&key) {
            return Ok(());
        }
        let Some(entry) = self.root_suites_running.remove(&key) else {
            return Ok(());
        };
        debug!(suite, client, "root suite finished");
        self.root_suites_done.insert(key, entry);
        self.print_status(true)
    }

    /// Record which test a root suite is currently executing. Ignored for
    /// suites that are not running.
    pub fn add_test_start(&mut self, test_name: &str, root_suite: &str, client: &str) -> io::Result<()> {
        let key = suite_key(root_suite, client);
        if !self.root_suites_running.contains_key(&key) {
            return Ok(());
        }
        self.current_test_by_root_suite.insert(key, test_name.to_string());
        self.print_status(true)
    }

    /// The test a `(suite, client)` pair most recently started, if any.
    #[must_use]
    pub fn current_test(&self, root_suite: &str, client: &str) -> Option<&str> {
        self.current_test_by_root_suite
            .get(&suite_key(root_suite, client))
            .map(String::as_str)
    }

    /// Ingest one client's result for one test. Statuses are one-shot:
    /// the stored record is never revised.
    pub fn add_test_result(&mut self, result: TestResult) -> io::Result<()> {
        let full_name = result.assertion_result.full_name.clone();
        let count = self.test_count.get(&full_name).copied().unwrap_or(0);
        if count >= self.num_clients {
            warn!(test = %full_name, "more reports than clients; dropping duplicate");
            return Ok(());
        }

        let root_suite = result
            .assertion_result
            .ancestor_titles
            .first()
            .cloned()
            .unwrap_or_else(|| result.test_file_path.clone());

        insert_result(&mut self.root, &result.assertion_result);

        match result.assertion_result.status {
            AssertionStatus::Skipped => self.num_skipped_tests += 1,
            AssertionStatus::Todo => self.num_todo_tests += 1,
            AssertionStatus::Failed => {
                self.num_failed_tests += 1;
                self.failed_suites.insert(root_suite);
            }
            AssertionStatus::Passed => {
                self.num_passed_tests += 1;
                self.passed_suites.insert(root_suite);
            }
        }

        self.results.push(result);

        let count = count + 1;
        self.test_count.insert(full_name, count);

        // Tree printing only sweeps once the test is resolved by every
        // client, so the recursive completeness gate and the count
        // invariant agree on the same moment.
        if count == self.num_clients {
            self.print_completed()?;
        }
        Ok(())
    }

    /// Buffer a console capture for `print_console`.
    pub fn add_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    #[must_use]
    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.num_failed_tests > 0 || self.results.iter().any(TestResult::is_failing)
    }

    fn badge(&self, badge: SuiteBadge, message: &str, client: Option<&str>) -> String {
        let mut prefix = match badge {
            SuiteBadge::Fail => inverse(&bold(&red(" FAIL "))),
            SuiteBadge::Pass => inverse(&bold(&green(" PASS "))),
            SuiteBadge::Running => inverse(&bold(&yellow(" RUN "))),
        };

        if let Some(client) = client {
            if self.num_clients > 1 {
                prefix.push(' ');
                prefix.push_str(&inverse(&white(&format!(" {client} "))));
            }
        }

        format!("{prefix} {message}")
    }

    /// Redraw the status area: erase the previous frame, write the new
    /// one, and remember its erase sequence for the next redraw.
    pub fn print_status(&mut self, with_summary: bool) -> io::Result<()> {
        let done_lines: Vec<String> = self
            .root_suites_done
            .values()
            .map(|sc| {
                let badge = if self.failed_suites.contains(&sc.suite) {
                    SuiteBadge::Fail
                } else {
                    SuiteBadge::Pass
                };
                self.badge(badge, &sc.suite, Some(&sc.client))
            })
            .collect();

        let running_lines: Vec<String> = self
            .root_suites_running
            .values()
            .map(|sc| self.badge(SuiteBadge::Running, &sc.suite, Some(&sc.client)))
            .collect();

        let summary = with_summary.then(|| self.get_summary(None));
        let progress =
            with_summary.then(|| (self.results.len(), self.num_estimated_total_tests));

        let StatusFrame { content, clear } =
            self.status.render(&done_lines, &running_lines, summary.as_deref(), progress);

        let previous = std::mem::take(&mut self.clear);
        self.out.write_all(previous.as_bytes())?;
        self.out.write_all(content.as_bytes())?;
        self.out.flush()?;
        self.clear = clear;
        Ok(())
    }

    /// Write out-of-band output without corrupting the status area.
    pub fn print_msg(&mut self, msg: &str) -> io::Result<()> {
        let status_was_printed = !self.clear.is_empty();
        self.clear_status()?;
        self.out.write_all(msg.as_bytes())?;
        if status_was_printed {
            self.print_status(true)?;
        }
        Ok(())
    }

    pub fn print_line(&mut self, text: &str, indent: usize) -> io::Result<()> {
        writeln!(self.out, "{}{text}", "  ".repeat(indent))
    }

    /// Print every suite subtree that became complete, at most once each.
    fn print_completed(&mut self) -> io::Result<()> {
        let mut buf = String::new();
        {
            let ctx = TreeCtx {
                test_count: &self.test_count,
                quorum: self.num_clients,
                verbose: self.verbose,
            };
            render_suite(&mut self.root, &ctx, 0, &mut buf);
        }
        if buf.is_empty() {
            return Ok(());
        }
        self.print_msg(&buf)
    }

    #[must_use]
    pub fn get_summary(&self, snapshot: Option<&MergedSnapshotSummary>) -> String {
        let counts = SummaryCounts {
            tests_passed: self.num_passed_tests,
            tests_failed: self.num_failed_tests,
            tests_skipped: self.num_skipped_tests,
            tests_todo: self.num_todo_tests,
            tests_total: self.results.len(),
            suites_passed: self.passed_suites.len(),
            suites_failed: self.failed_suites.len(),
            suites_total: self.root_suites_done.len(),
        };
        render_summary(&counts, snapshot, self.start.elapsed())
    }

    /// Print the combined failure report.
    ///
    /// Message cleanup is asynchronous and unordered, so every message is
    /// fanned out to a scoped worker and the results are reassembled by
    /// original result order before a single byte is printed.
    pub fn print_failures(&mut self) -> io::Result<()> {
        let failing: Vec<(String, Vec<String>)> = self
            .results
            .iter()
            .filter(|r| r.is_failing())
            .map(|r| {
                let mut messages = r.assertion_result.failure_messages.clone();
                messages.extend(r.errors.iter().cloned());
                (r.assertion_result.full_name.clone(), messages)
            })
            .collect();

        if failing.is_empty() {
            return Ok(());
        }

        let processor = &self.process_error;
        let cleaned: Vec<Vec<String>> = thread::scope(|scope| {
            let handles: Vec<_> = failing
                .iter()
                .map(|(_, messages)| {
                    scope.spawn(move || {
                        messages.iter().map(|m| processor.process(m)).collect::<Vec<String>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("failure formatting worker panicked");
                        Vec::new()
                    })
                })
                .collect()
        });

        write!(self.out, "\n{}\n", bold("Summary of all failing tests"))?;
        for ((full_name, _), messages) in failing.iter().zip(cleaned) {
            write!(self.out, "\n  {} {}\n\n", red(&bold("\u{25cf}")), bold(full_name))?;
            for message in messages {
                for line in message.lines() {
                    writeln!(self.out, "    {line}")?;
                }
            }
        }
        self.out.flush()
    }

    /// Print buffered console captures, origins cleaned through the error
    /// processor (fan-out, reassembled in capture order).
    pub fn print_console(&mut self) -> io::Result<()> {
        if self.logs.is_empty() {
            return Ok(());
        }

        let title_indent = if self.verbose { "  " } else { "    " };
        let console_indent = format!("{title_indent}  ");

        let processor = &self.process_error;
        let origins: Vec<String> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .logs
                .iter()
                .map(|entry| scope.spawn(move || processor.process(&entry.origin)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_default())
                .collect()
        });

        let mut combined = String::new();
        for (entry, origin) in self.logs.iter().zip(origins) {
            let message = entry
                .message
                .lines()
                .map(|line| format!("{console_indent}{line}"))
                .collect::<Vec<_>>()
                .join("\n");

            let type_message = format!("console.{}", entry.kind.as_str());
            let (type_message, message) = match entry.kind {
                LogKind::Warn => (yellow(&type_message), yellow(&message)),
                LogKind::Error => (red(&type_message), red(&message)),
                _ => (type_message, message),
            };

            combined.push_str(&format!(
                "{title_indent}{}\n{}\n{}\n\n",
                dim(&type_message),
                message.trim_end(),
                dim(origin.trim_end()),
            ));
        }

        write!(self.out, "\n{combined}\n")
    }

    fn print_snapshot_summary(&mut self, snap: &MergedSnapshotSummary) -> io::Result<()> {
        if self.num_clients > 1 {
            writeln!(self.out, "\nSkipping snapshot update for multiple clients")?;
            return Ok(());
        }

        if snap.added == 0 && snap.unmatched == 0 && snap.updated == 0 && snap.files_removed == 0 {
            return Ok(());
        }

        writeln!(self.out)?;

        if snap.added > 0 {
            writeln!(
                self.out,
                "{ARROW}{} written from {}.",
                bold(&green(&pluralize("snapshot", snap.added))),
                pluralize("test suite", snap.files_added.max(1)),
            )?;
        }
        if snap.updated > 0 {
            writeln!(
                self.out,
                "{ARROW}{} updated.",
                bold(&green(&pluralize("snapshot", snap.updated))),
            )?;
        }
        if snap.files_removed > 0 {
            writeln!(
                self.out,
                "{ARROW}{} removed.",
                bold(&green(&pluralize("snapshot file", snap.files_removed))),
            )?;
            for path in &snap.files_removed_list {
                writeln!(self.out, "{}", dim(&format!("  \u{21b3} {}", path.display())))?;
            }
        }
        if snap.unmatched > 0 {
            writeln!(
                self.out,
                "{ARROW}{} failed. Inspect your code changes or press u to update them.",
                bold(&red(&pluralize("snapshot", snap.unmatched))),
            )?;
        }
        if snap.unchecked > 0 {
            writeln!(
                self.out,
                "{ARROW}{} obsolete. To remove them all, press u.",
                bold(&yellow(&pluralize("snapshot", snap.unchecked))),
            )?;
            for (path, keys) in &snap.unchecked_keys_by_file {
                writeln!(self.out, "{}", dim(&format!("  \u{21b3} {}", path.display())))?;
                for key in keys {
                    writeln!(self.out, "{}", dim(&format!("      \u{2022} {key}")))?;
                }
            }
        }

        Ok(())
    }

    /// Merge per-client snapshot summaries and print the end-of-run
    /// report: snapshot section, buffered console output, counts block.
    ///
    /// `resolver` maps a `(suite name, client)` pair to that client's
    /// golden file path; different clients keep different partitions, so
    /// list fields are resolved per client before concatenation.
    pub fn print_summary<R>(
        &mut self,
        states: &BTreeMap<String, SnapshotSummary>,
        resolver: R,
    ) -> io::Result<()>
    where
        R: Fn(&str, &str) -> PathBuf,
    {
        let mut merged = MergedSnapshotSummary::default();

        for (client, state) in states {
            if !merged.did_update {
                merged.did_update = state.updated > 0;
            }

            merged.total += state.total;
            merged.added += state.added;
            merged.matched += state.matched;
            merged.unchecked += state.unchecked;
            merged.unmatched += state.unmatched;
            merged.updated += state.updated;

            merged.files_added += state.suites_added;
            merged.files_removed += state.suites_removed;
            merged
                .files_removed_list
                .extend(state.suites_removed_list.iter().map(|name| resolver(name, client)));

            merged.unchecked_keys_by_file.extend(
                state
                    .unchecked_keys_by_suite
                    .iter()
                    .filter(|unchecked| !unchecked.keys.is_empty())
                    .map(|unchecked| (resolver(&unchecked.suite, client), unchecked.keys.clone())),
            );
        }

        self.print_snapshot_summary(&merged)?;
        self.print_console()?;

        let summary = self.get_summary(Some(&merged));
        write!(self.out, "\n{summary}\n")?;
        self.out.flush()
    }

    pub fn print_watch_prompt(&mut self) -> io::Result<()> {
        write!(
            self.out,
            "\n{}\n{} q {}\n{} a {}\n{} u {}\n\n",
            bold("Watch Usage"),
            dim(&format!("{ARROW}Press")),
            dim("to quit."),
            dim(&format!("{ARROW}Press")),
            dim("to run all tests."),
            dim(&format!("{ARROW}Press")),
            dim("to update snapshots."),
        )
    }

    /// Consume the printer, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
