//! Host-side run driver.
//!
//! Glues the typed client messages to the printer and collects each
//! client's end-of-run snapshot summary. All inbound events funnel through
//! one `RunReporter`, which is the single logical thread of control that
//! serializes state mutation; snapshot files are only written here, after
//! clients have reported, through the per-client partitioned resolver.

use std::collections::BTreeMap;
use std::io::{self, Write};

use tracing::{debug, info};

use webrun_core::{ClientMessage, Config, TestResult, UpdatePolicy};
use webrun_snapshot::{SnapshotError, SnapshotSummary, resolve_snapshot_path, save};

use crate::printer::{ErrorProcessor, Printer, PrinterOptions};

pub struct RunReporter<W: Write, P: ErrorProcessor> {
    printer: Printer<W, P>,
    config: Config,
    /// Latest snapshot summary per client identity.
    snapshot_states: BTreeMap<String, SnapshotSummary>,
    /// Watch mode: print the key prompt after each run.
    watch: bool,
}

impl<W: Write, P: ErrorProcessor> RunReporter<W, P> {
    pub fn new(out: W, process_error: P, config: Config, opts: PrinterOptions, watch: bool) -> Self {
        let mut opts = opts;
        opts.verbose = opts.verbose || config.verbose;
        Self {
            printer: Printer::new(out, process_error, opts),
            config,
            snapshot_states: BTreeMap::new(),
            watch,
        }
    }

    pub fn printer(&mut self) -> &mut Printer<W, P> {
        &mut self.printer
    }

    /// Start of a host-level run: clear the terminal and drop all state
    /// from the previous run.
    pub fn on_run_start(&mut self) -> io::Result<()> {
        self.snapshot_states.clear();
        self.printer.clear_screen()?;
        self.printer.run_start(0);
        Ok(())
    }

    /// Dispatch one lifecycle message from a client.
    pub fn handle_message(&mut self, client: &str, message: ClientMessage) -> io::Result<()> {
        match message {
            ClientMessage::RunStart { total_tests, .. } => {
                debug!(client, total_tests, "client run started");
                self.printer.set_estimated_total(total_tests);
                Ok(())
            }
            ClientMessage::RootSuiteStarted { name } => self.printer.add_root_suite(&name, client),
            ClientMessage::TestStart { name, root_suite } => {
                // A test start doubles as the running signal for its root
                // suite, for clients that never send an explicit start.
                self.printer.add_root_suite(&root_suite, client)?;
                self.printer.add_test_start(&name, &root_suite, client)
            }
            ClientMessage::RootSuiteFinished { name } => {
                self.printer.root_suite_finished(&name, client)
            }
            ClientMessage::Log(entry) => {
                self.printer.add_log(entry);
                Ok(())
            }
        }
    }

    pub fn on_test_result(&mut self, result: TestResult) -> io::Result<()> {
        self.printer.add_test_result(result)
    }

    /// Record a client's end-of-run snapshot summary.
    pub fn on_client_complete(&mut self, client: &str, summary: SnapshotSummary) {
        debug!(client, total = summary.total, unchecked = summary.unchecked, "client completed");
        self.snapshot_states.insert(client.to_string(), summary);
    }

    /// End of the host-level run: failures first, then the combined
    /// summary, then (in watch mode) the key prompt.
    pub fn on_run_complete(&mut self) -> io::Result<()> {
        self.printer.run_finished();

        if self.printer.has_failures() {
            self.printer.print_failures()?;
        }

        let snapshot_dir = self.config.snapshot_dir.clone();
        let states = std::mem::take(&mut self.snapshot_states);
        self.printer.print_summary(&states, |suite, client| {
            resolve_snapshot_path(&snapshot_dir, suite, client)
        })?;
        self.snapshot_states = states;

        if self.watch {
            self.printer.print_watch_prompt()?;
        }
        Ok(())
    }

    /// Persist every client's snapshot next-state unconditionally. Bound
    /// to the host's `u` key in watch mode; snapshots are updated from the
    /// recorded observations without rerunning the suite.
    pub fn update_snapshots(&mut self) -> Result<bool, SnapshotError> {
        let mut wrote = false;
        for (client, state) in &self.snapshot_states {
            let snapshot_dir = &self.config.snapshot_dir;
            let client_wrote = save(
                |suite| resolve_snapshot_path(snapshot_dir, suite, client),
                state,
                UpdatePolicy::All,
            )?;
            wrote |= client_wrote;
        }
        info!(wrote, "snapshot update finished");
        Ok(wrote)
    }

    /// Consume the reporter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.printer.into_inner()
    }
}
