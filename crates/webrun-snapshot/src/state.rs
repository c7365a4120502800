//! Per-run snapshot matching engine.
//!
//! A `SnapshotState` is seeded with the suites loaded from disk and owns a
//! mutable copy for the duration of one run. Every observed value is
//! written into that copy regardless of match outcome, so the store always
//! reflects what actually ran — a later `All`-policy save persists the
//! latest observations, never stale prior values.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use webrun_core::UpdatePolicy;

use crate::types::{
    SerializedSnapshotSuite, Snapshot, SnapshotSuite, SnapshotSummary, UncheckedKeys,
};

/// Outcome of matching one observed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Snapshot key: `"<joined test path>: <hint>"`.
    pub key: String,
    pub pass: bool,
    /// The observed value after normalization.
    pub actual: String,
    /// The previously stored value, if any.
    pub expected: Option<String>,
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Matching engine for one client's run.
#[derive(Debug)]
pub struct SnapshotState {
    update: UpdatePolicy,
    /// Mutable copy of the loaded suites, keyed by suite name.
    data: BTreeMap<String, SnapshotSuite>,
    /// Flattened name -> snapshot index over `data`.
    snapshots: BTreeMap<String, Snapshot>,
    /// Keys loaded from disk but not re-observed this run.
    unchecked_keys: BTreeSet<String>,
    /// Suite names present in the loaded store, for added/removed deltas.
    initial_suites: BTreeSet<String>,

    pub added: u32,
    pub matched: u32,
    pub unmatched: u32,
    pub updated: u32,
    pub errored: u32,
}

impl SnapshotState {
    /// Build a state over the previously persisted suites. The initial
    /// store is an explicit argument; the engine reads no ambient state.
    #[must_use]
    pub fn new(update: UpdatePolicy, initial: Vec<SnapshotSuite>) -> Self {
        let data: BTreeMap<String, SnapshotSuite> =
            initial.into_iter().map(|suite| (suite.name.clone(), suite)).collect();

        let snapshots: BTreeMap<String, Snapshot> = data
            .values()
            .flat_map(|suite| suite.snapshots.iter())
            .map(|(key, snap)| (key.clone(), snap.clone()))
            .collect();

        let unchecked_keys = snapshots.keys().cloned().collect();
        let initial_suites = data.keys().cloned().collect();

        Self {
            update,
            data,
            snapshots,
            unchecked_keys,
            initial_suites,
            added: 0,
            matched: 0,
            unmatched: 0,
            updated: 0,
            errored: 0,
        }
    }

    /// Record the observed value under `key`, superseding any prior
    /// snapshot, and drop the key from the unchecked set.
    fn update_snapshot(&mut self, root_name: &str, key: &str, received: &str) {
        let suite = self
            .data
            .entry(root_name.to_string())
            .or_insert_with(|| SnapshotSuite::new(root_name));

        let snap = Snapshot { name: key.to_string(), data: received.to_string(), lang: None };

        suite.snapshots.insert(key.to_string(), snap.clone());
        self.snapshots.insert(key.to_string(), snap);
        self.unchecked_keys.remove(key);
    }

    /// Match an observed value against the store.
    ///
    /// `test_path` is the ancestor-title path of the test, root suite
    /// first; `received` is the value in its canonical serialized text
    /// form (leading/trailing generated whitespace is trimmed here).
    pub fn match_snapshot(&mut self, test_path: &[String], hint: &str, received: &str) -> MatchOutcome {
        let actual = received.trim().to_string();
        let key = format!("{}: {hint}", test_path.join(" "));

        let expected = self.snapshots.get(&key).cloned();
        let mut pass = match &expected {
            Some(snap) => actual == normalize_newlines(&snap.data),
            None => true,
        };

        if self.update == UpdatePolicy::All && !pass {
            self.updated += 1;
            pass = true;
        } else if expected.is_none() {
            if self.update == UpdatePolicy::New {
                self.added += 1;
            } else {
                pass = false;
                self.unmatched += 1;
            }
        } else if pass {
            self.matched += 1;
        } else {
            self.errored += 1;
        }

        let root_name = test_path.first().map(String::as_str).unwrap_or_default();
        self.update_snapshot(root_name, &key, &actual);

        debug!(key = %key, pass, "snapshot matched");

        MatchOutcome { key, pass, actual, expected: expected.map(|snap| snap.data) }
    }

    /// Keep a failed or skipped test's stored snapshots out of the
    /// orphan report: not executing a test is no evidence its snapshots
    /// were removed.
    ///
    /// The key namespace check is a plain string prefix on
    /// `"<testName>:"`, which can both under- and over-match when one
    /// test's full name is a textual prefix of another's. Kept as-is.
    pub fn mark_snapshots_as_checked_for_test(&mut self, test_name: &str) {
        let prefix = format!("{test_name}:");
        self.unchecked_keys.retain(|key| !key.starts_with(&prefix));
    }

    /// Compute the run summary. Pure over the accumulated state: calling
    /// it repeatedly without intervening matches yields identical results.
    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        let mut next_data = Vec::new();
        let mut unchecked_keys_by_suite = Vec::new();
        let mut suites_added = 0;
        let mut removed_suites = Vec::new();

        for (suite_name, suite) in &self.data {
            let mut kept = Vec::new();
            let mut suite_unchecked = Vec::new();

            for (key, snap) in &suite.snapshots {
                if self.unchecked_keys.contains(key) {
                    suite_unchecked.push(key.clone());
                } else {
                    kept.push(snap.clone());
                }
            }

            unchecked_keys_by_suite
                .push(UncheckedKeys { suite: suite.name.clone(), keys: suite_unchecked });

            if !self.initial_suites.contains(suite_name) {
                suites_added += 1;
            } else if kept.is_empty() {
                removed_suites.push(suite_name.clone());
            }

            next_data.push(SerializedSnapshotSuite { name: suite_name.clone(), snapshots: kept });
        }

        SnapshotSummary {
            errored: self.errored,
            unmatched: self.unmatched,
            matched: self.matched,
            updated: self.updated,
            added: self.added,
            total: self.snapshots.len() as u32,
            suites_added,
            suites_removed: removed_suites.len() as u32,
            suites_removed_list: removed_suites,
            unchecked: self.unchecked_keys.len() as u32,
            unchecked_keys: self.unchecked_keys.iter().cloned().collect(),
            unchecked_keys_by_suite,
            result: next_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_suite(name: &str, entries: &[(&str, &str)]) -> SnapshotSuite {
        let mut suite = SnapshotSuite::new(name);
        for (key, data) in entries {
            suite.snapshots.insert(
                (*key).to_string(),
                Snapshot { name: (*key).to_string(), data: (*data).to_string(), lang: None },
            );
        }
        suite
    }

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn unseen_key_is_added_under_new_policy() {
        let mut state = SnapshotState::new(UpdatePolicy::New, vec![]);
        let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "foo");
        assert!(outcome.pass);
        assert_eq!(outcome.key, "a.test.js t: 1");
        assert_eq!(state.added, 1);
        assert_eq!(outcome.expected, None);
    }

    #[test]
    fn unseen_key_is_unmatched_under_no_and_all_policies() {
        for policy in [UpdatePolicy::No, UpdatePolicy::All] {
            let mut state = SnapshotState::new(policy, vec![]);
            let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "foo");
            assert!(!outcome.pass, "policy {policy:?}");
            assert_eq!(state.unmatched, 1);
        }
    }

    #[test]
    fn equal_value_matches_under_any_policy() {
        for policy in [UpdatePolicy::No, UpdatePolicy::New, UpdatePolicy::All] {
            let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "foo")]);
            let mut state = SnapshotState::new(policy, vec![suite]);
            let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "foo");
            assert!(outcome.pass, "policy {policy:?}");
            assert_eq!(state.matched, 1);
        }
    }

    #[test]
    fn mismatch_is_rewritten_under_all_policy() {
        let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "foo")]);
        let mut state = SnapshotState::new(UpdatePolicy::All, vec![suite]);
        let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "bar");
        assert!(outcome.pass);
        assert_eq!(state.updated, 1);
        assert_eq!(outcome.expected.as_deref(), Some("foo"));

        // The persisted next-state carries the new observation.
        let summary = state.summary();
        assert_eq!(summary.result[0].snapshots[0].data, "bar");
    }

    #[test]
    fn mismatch_errors_under_no_and_new_policies() {
        for policy in [UpdatePolicy::No, UpdatePolicy::New] {
            let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "foo")]);
            let mut state = SnapshotState::new(policy, vec![suite]);
            let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "bar");
            assert!(!outcome.pass, "policy {policy:?}");
            assert_eq!(state.errored, 1);
        }
    }

    #[test]
    fn observed_value_replaces_store_even_on_mismatch() {
        let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "foo")]);
        let mut state = SnapshotState::new(UpdatePolicy::No, vec![suite]);
        state.match_snapshot(&path(&["a.test.js", "t"]), "1", "bar");

        let summary = state.summary();
        assert_eq!(summary.result[0].snapshots[0].data, "bar");
        assert_eq!(summary.unchecked, 0);
    }

    #[test]
    fn stored_crlf_data_compares_equal_to_normalized_observation() {
        let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "line\r\ntwo")]);
        let mut state = SnapshotState::new(UpdatePolicy::No, vec![suite]);
        let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "line\ntwo");
        assert!(outcome.pass);
        assert_eq!(state.matched, 1);
    }

    #[test]
    fn received_value_is_trimmed_before_compare() {
        let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "foo")]);
        let mut state = SnapshotState::new(UpdatePolicy::No, vec![suite]);
        let outcome = state.match_snapshot(&path(&["a.test.js", "t"]), "1", "\nfoo\n");
        assert!(outcome.pass);
        assert_eq!(outcome.actual, "foo");
    }

    #[test]
    fn unexercised_keys_are_reported_unchecked_not_removed() {
        let suite = loaded_suite(
            "a.test.js",
            &[
                ("a.test.js t: 1", "one"),
                ("a.test.js t: 2", "two"),
                ("a.test.js t: 3", "three"),
            ],
        );
        let mut state = SnapshotState::new(UpdatePolicy::New, vec![suite]);
        state.match_snapshot(&path(&["a.test.js", "t"]), "1", "one");

        let summary = state.summary();
        assert_eq!(summary.unchecked, 2);
        assert_eq!(summary.unchecked_keys_by_suite.len(), 1);
        assert_eq!(
            summary.unchecked_keys_by_suite[0].keys,
            vec!["a.test.js t: 2".to_string(), "a.test.js t: 3".to_string()]
        );
        // Suite still has one kept snapshot, so it is not removed.
        assert_eq!(summary.suites_removed, 0);
    }

    #[test]
    fn suite_with_zero_kept_snapshots_is_removed() {
        let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "one")]);
        let state = SnapshotState::new(UpdatePolicy::New, vec![suite]);

        let summary = state.summary();
        assert_eq!(summary.suites_removed, 1);
        assert_eq!(summary.suites_removed_list, vec!["a.test.js".to_string()]);
        assert!(summary.result[0].snapshots.is_empty());
    }

    #[test]
    fn new_suite_counts_as_added() {
        let mut state = SnapshotState::new(UpdatePolicy::New, vec![]);
        state.match_snapshot(&path(&["b.test.js", "t"]), "1", "x");

        let summary = state.summary();
        assert_eq!(summary.suites_added, 1);
        assert_eq!(summary.suites_removed, 0);
    }

    #[test]
    fn marking_checked_shields_a_skipped_tests_snapshots() {
        let suite = loaded_suite("a.test.js", &[("a.test.js skipped test: 1", "x")]);
        let mut state = SnapshotState::new(UpdatePolicy::New, vec![suite]);
        state.mark_snapshots_as_checked_for_test("a.test.js skipped test");

        let summary = state.summary();
        assert_eq!(summary.unchecked, 0);
        // Shielded keys stay in the kept set.
        assert_eq!(summary.result[0].snapshots.len(), 1);
    }

    #[test]
    fn marking_checked_uses_plain_prefix_semantics() {
        // "t" is a textual prefix of nothing here because the namespace
        // separator is the colon; "t other" does not start with "t:".
        let suite = loaded_suite(
            "a.test.js",
            &[("a.test.js t: 1", "x"), ("a.test.js t other: 1", "y")],
        );
        let mut state = SnapshotState::new(UpdatePolicy::New, vec![suite]);
        state.mark_snapshots_as_checked_for_test("a.test.js t");

        let summary = state.summary();
        assert_eq!(summary.unchecked_keys, vec!["a.test.js t other: 1".to_string()]);
    }

    #[test]
    fn summary_is_idempotent() {
        let suite = loaded_suite("a.test.js", &[("a.test.js t: 1", "one")]);
        let mut state = SnapshotState::new(UpdatePolicy::New, vec![suite]);
        state.match_snapshot(&path(&["a.test.js", "t"]), "1", "one");

        assert_eq!(state.summary(), state.summary());
    }
}
