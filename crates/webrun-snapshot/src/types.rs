//! Snapshot containers and the per-run summary record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One persisted golden value.
///
/// `name` is derived as `"<fullTestName>: <hint-or-ordinal>"` and is unique
/// within its suite. A snapshot is never merged in place; an update replaces
/// the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub data: String,
    /// Language tag for the fenced block in the persisted file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// All snapshots belonging to one root suite (one test source file).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSuite {
    pub name: String,
    /// Keyed by snapshot name. Ordered so serialization is deterministic;
    /// insertion order carries no meaning.
    pub snapshots: BTreeMap<String, Snapshot>,
}

impl SnapshotSuite {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), snapshots: BTreeMap::new() }
    }
}

/// Persistence projection of a suite: snapshots flattened into a vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedSnapshotSuite {
    pub name: String,
    pub snapshots: Vec<Snapshot>,
}

impl From<&SnapshotSuite> for SerializedSnapshotSuite {
    fn from(suite: &SnapshotSuite) -> Self {
        Self {
            name: suite.name.clone(),
            snapshots: suite.snapshots.values().cloned().collect(),
        }
    }
}

/// Unchecked (orphaned) snapshot keys for one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncheckedKeys {
    pub suite: String,
    pub keys: Vec<String>,
}

/// Aggregate outcome of one client's snapshot activity for a run.
///
/// Computed once by [`crate::SnapshotState::summary`] and read-only
/// afterward; `result` carries the full next-state for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub errored: u32,
    pub unmatched: u32,
    pub matched: u32,
    pub updated: u32,
    pub added: u32,
    /// Total snapshots known at the end of the run (stored + observed).
    pub total: u32,
    pub suites_added: u32,
    pub suites_removed: u32,
    pub suites_removed_list: Vec<String>,
    /// Count of persisted snapshots never re-observed this run.
    pub unchecked: u32,
    pub unchecked_keys: Vec<String>,
    pub unchecked_keys_by_suite: Vec<UncheckedKeys>,
    /// Next-state of every suite, unchecked keys pruned.
    pub result: Vec<SerializedSnapshotSuite>,
}

impl SnapshotSummary {
    /// Whether this run produced any change worth reporting in the
    /// snapshot section of the final summary.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.unmatched > 0 || self.updated > 0 || self.suites_removed > 0
    }
}
