//! Client lifecycle messages.
//!
//! Browser clients report a small closed set of JSON messages tagged by a
//! `jestType` field with the data under `payload`. The host deserializes
//! them into [`ClientMessage`] and dispatches each variant to a dedicated
//! handler; there is no untyped switch in the pipeline.
//!
//! Wire shapes:
//!
//! ```json
//! {"jestType":"run_start","payload":{"totalTests":12,"testFiles":["a.test.js"],"focused":false}}
//! {"jestType":"rootSuite_start","payload":{"name":"math"}}
//! {"jestType":"test_start","payload":{"name":"adds","rootSuite":"math"}}
//! {"jestType":"rootSuite_finish","payload":{"name":"math"}}
//! {"jestType":"log","payload":{"message":"hi","type":"warn","origin":"..."}}
//! ```

use serde::{Deserialize, Serialize};

/// Console method a captured log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl LogKind {
    /// Name used in the `console.<kind>` header when printing.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

/// A console capture forwarded by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Stack excerpt pointing at the call site; cleaned through the error
    /// processor before printing.
    pub origin: String,
}

/// Lifecycle message from one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "jestType", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "run_start", rename_all = "camelCase")]
    RunStart {
        total_tests: usize,
        #[serde(default)]
        test_files: Vec<String>,
        #[serde(default)]
        focused: bool,
    },
    #[serde(rename = "rootSuite_start")]
    RootSuiteStarted { name: String },
    #[serde(rename = "test_start", rename_all = "camelCase")]
    TestStart { name: String, root_suite: String },
    #[serde(rename = "rootSuite_finish")]
    RootSuiteFinished { name: String },
    #[serde(rename = "log")]
    Log(LogEntry),
}
