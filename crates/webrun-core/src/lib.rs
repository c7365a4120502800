#![forbid(unsafe_code)]

//! Shared vocabulary for the webrun reporting pipeline.
//!
//! # Role in webrun
//! `webrun-core` defines the data that crosses the wire between browser
//! clients and the host reporter: per-test results, lifecycle messages, log
//! captures, and the run configuration. The snapshot engine and the live
//! reporter both speak these types, so they live here without dragging in
//! any I/O or rendering dependencies.
//!
//! # This crate provides
//! - [`TestResult`] / [`AssertionResult`] — the immutable per-test record a
//!   client reports once a test finishes.
//! - [`ClientMessage`] — the typed lifecycle event enum (run start, test
//!   start, root-suite finish, console log).
//! - [`Config`] and [`UpdatePolicy`] — run-wide settings, including the
//!   snapshot update mode.

/// Run configuration and snapshot update policy.
pub mod config;
/// Typed client lifecycle messages and console-log capture records.
pub mod protocol;
/// Per-test result records reported by clients.
pub mod result;

pub use config::{Config, UpdatePolicy};
pub use protocol::{ClientMessage, LogEntry, LogKind};
pub use result::{AssertionResult, AssertionStatus, TestResult};
