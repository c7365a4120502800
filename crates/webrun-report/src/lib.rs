#![forbid(unsafe_code)]

//! Cross-client result aggregation and live terminal reporting.
//!
//! # Role in webrun
//! The host process feeds every per-test result and lifecycle message from
//! every client into one [`Printer`], which owns the suite tree, the
//! per-client completion bookkeeping, and the summary counters, and drives
//! an always-consistent incremental terminal view. [`RunReporter`] wraps
//! the printer with the host-side glue: typed message dispatch, per-client
//! snapshot summaries, and the update-snapshots action.
//!
//! # This crate provides
//! - [`Printer`] — the result aggregator and terminal writer.
//! - [`RunReporter`] — the host-side run driver.
//! - [`StatusRenderer`] — the status frame and its erase sequence.
//! - [`ErrorProcessor`] — the stack-cleanup collaborator seam.

/// Result aggregation and terminal printing.
pub mod printer;
/// Host-side run driver.
pub mod reporter;
/// Live status frames and erase sequences.
pub mod status;
/// SGR styling and ANSI-aware measurement.
pub mod style;
/// Final run summary text.
pub mod summary;

pub use printer::{ErrorProcessor, PassthroughErrors, Printer, PrinterOptions};
pub use reporter::RunReporter;
pub use status::{ERASE_LINE_UNIT, StatusFrame, StatusRenderer};
pub use summary::{MergedSnapshotSummary, SummaryCounts};
