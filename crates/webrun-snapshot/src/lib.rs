#![forbid(unsafe_code)]

//! Golden snapshot store and matching engine for webrun.
//!
//! # Role in webrun
//! Each browser client runs the suite against its own [`SnapshotState`],
//! seeded from the suites previously persisted on disk. At the end of a run
//! the state produces a [`SnapshotSummary`] — counters plus the full
//! next-state of the store — which the host merges across clients and
//! persists through [`serializer::save`].
//!
//! # This crate provides
//! - [`serializer`] — lossless round-trip between a suite and its Markdown
//!   persistence format, plus the policy-gated `save` entry point.
//! - [`state`] — per-run matching of observed values against the loaded
//!   store, unchecked-key (orphan) tracking, and summary computation.
//! - [`resolver`] — the per-client partitioned snapshot file path scheme.
//!
//! Snapshot files are partitioned per client identity
//! (`<dir>/<suite>__<client>.md`), so concurrently reporting clients never
//! contend on the same file; within one run only the host process writes,
//! after every client has reported its summary.

/// Per-client snapshot file path scheme.
pub mod resolver;
/// Markdown persistence format and policy-gated saving.
pub mod serializer;
/// Per-run snapshot matching and summary computation.
pub mod state;
/// Snapshot suite containers and the run summary record.
pub mod types;

pub use resolver::{resolve_snapshot_path, resolve_suite_name};
pub use serializer::{SnapshotError, deserialize, save, serialize};
pub use state::{MatchOutcome, SnapshotState};
pub use types::{
    SerializedSnapshotSuite, Snapshot, SnapshotSuite, SnapshotSummary, UncheckedKeys,
};
