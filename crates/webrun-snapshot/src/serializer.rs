//! Markdown persistence format for snapshot suites.
//!
//! One file per suite: a level-1 heading with the suite name, then for each
//! snapshot a level-2 heading followed by a fenced code block holding the
//! raw payload. The fence starts at three backticks and grows until the
//! payload no longer contains it, so a payload can embed backtick runs of
//! any length without closing the block early.
//!
//! Deserialization is a tolerant line reader: anything that is not a
//! heading or a fenced block is ignored, and unparseable content yields an
//! empty suite rather than an error — a corrupted golden file must not take
//! down the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use webrun_core::UpdatePolicy;

use crate::types::{SerializedSnapshotSuite, Snapshot, SnapshotSuite, SnapshotSummary};

/// Failure while persisting the snapshot store.
///
/// Fatal to the update action only; in-memory run results are unaffected.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to delete snapshot file {path}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Find a fence delimiter that does not occur in `payload`, starting at
/// three backticks and extending one at a time.
fn safe_code_fence(payload: &str) -> String {
    let mut delimiter = String::from("```");
    while payload.contains(&delimiter) {
        delimiter.push('`');
    }
    delimiter
}

/// Render a suite to its on-disk text form.
#[must_use]
pub fn serialize(suite: &SerializedSnapshotSuite) -> String {
    let mut content = format!("# {}\n\n", suite.name);

    for snap in &suite.snapshots {
        let delim = safe_code_fence(&snap.data);
        content.push_str(&format!("## {}\n\n", snap.name));
        content.push_str(&format!("{delim}{}\n", snap.lang.as_deref().unwrap_or("")));
        content.push_str(&format!("{}\n", snap.data));
        content.push_str(&format!("{delim}\n\n"));
    }

    content
}

/// Count the leading backticks of a line, if it opens or closes a fence.
fn fence_len(line: &str) -> usize {
    line.chars().take_while(|&c| c == '`').count()
}

/// Parse the on-disk text form back into a suite.
///
/// Headings and code blocks are consumed in document order; everything else
/// is skipped. Content that never forms a heading or block produces an
/// empty suite.
#[must_use]
pub fn deserialize(content: &str) -> SnapshotSuite {
    let mut suite = SnapshotSuite::default();
    let mut current: Option<Snapshot> = None;

    // Fence state: delimiter length and the payload lines seen so far.
    let mut fence: Option<(usize, Vec<&str>)> = None;

    for line in content.split('\n') {
        if let Some((len, lines)) = fence.as_mut() {
            let ticks = fence_len(line);
            if ticks >= *len && line.trim_end().chars().all(|c| c == '`') {
                if let Some(snap) = current.as_mut() {
                    snap.data = lines.join("\n");
                }
                fence = None;
            } else {
                lines.push(line);
            }
            continue;
        }

        if let Some(name) = line.strip_prefix("# ") {
            suite.name = name.trim_end().to_string();
        } else if let Some(name) = line.strip_prefix("## ") {
            if let Some(snap) = current.take() {
                suite.snapshots.insert(snap.name.clone(), snap);
            }
            current = Some(Snapshot {
                name: name.trim_end().to_string(),
                data: String::new(),
                lang: None,
            });
        } else {
            let ticks = fence_len(line);
            if ticks >= 3 {
                let lang = line[ticks..].trim();
                if let Some(snap) = current.as_mut() {
                    snap.lang = (!lang.is_empty()).then(|| lang.to_string());
                }
                fence = Some((ticks, Vec::new()));
            }
        }
    }

    // An unterminated fence keeps whatever payload lines it collected.
    if let (Some((_, lines)), Some(snap)) = (fence, current.as_mut()) {
        snap.data = lines.join("\n");
    }
    if let Some(snap) = current.take() {
        suite.snapshots.insert(snap.name.clone(), snap);
    }

    suite
}

/// Read and parse a suite file.
pub fn load(path: &Path) -> io::Result<SnapshotSuite> {
    let content = fs::read_to_string(path)?;
    Ok(deserialize(&content))
}

/// Persist a run's snapshot next-state according to the update policy.
///
/// Returns whether anything was written. Per suite, a zero-snapshot result
/// deletes the file; otherwise the serialized form is written, creating
/// parent directories as needed. Writes are not transactional: a crash can
/// leave a partially written file.
pub fn save<F>(
    resolver: F,
    summary: &SnapshotSummary,
    update: UpdatePolicy,
) -> Result<bool, SnapshotError>
where
    F: Fn(&str) -> PathBuf,
{
    let mut wrote = false;

    let nothing_new = summary.added == 0 && summary.unmatched == 0;
    let has_changes =
        nothing_new || summary.updated > 0 || summary.suites_removed > 0 || summary.errored > 0;

    match update {
        UpdatePolicy::No => return Ok(wrote),
        UpdatePolicy::New if nothing_new => return Ok(wrote),
        UpdatePolicy::All if !has_changes => return Ok(wrote),
        _ => {}
    }

    for suite in &summary.result {
        let path = resolver(&suite.name);

        if suite.snapshots.is_empty() {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), suite = %suite.name, "snapshot file removed");
                    wrote = true;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(SnapshotError::Delete { path, source }),
            }
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| SnapshotError::Write { path: path.clone(), source })?;
            }
            fs::write(&path, serialize(suite))
                .map_err(|source| SnapshotError::Write { path: path.clone(), source })?;
            debug!(
                path = %path.display(),
                suite = %suite.name,
                snapshots = suite.snapshots.len(),
                "snapshot file written"
            );
            wrote = true;
        }
    }

    Ok(wrote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite_with(snapshots: Vec<Snapshot>) -> SerializedSnapshotSuite {
        SerializedSnapshotSuite { name: "widgets.test.js".into(), snapshots }
    }

    fn snap(name: &str, data: &str) -> Snapshot {
        Snapshot { name: name.into(), data: data.into(), lang: None }
    }

    #[test]
    fn fence_grows_past_embedded_backticks() {
        assert_eq!(safe_code_fence("plain"), "```");
        assert_eq!(safe_code_fence("a ``` b"), "````");
        assert_eq!(safe_code_fence("a ````` b"), "``````");
    }

    #[test]
    fn round_trips_a_plain_suite() {
        let suite = suite_with(vec![
            snap("widgets render: 1", "<div>\n  hi\n</div>"),
            snap("widgets render: 2", "42"),
        ]);

        let parsed = deserialize(&serialize(&suite));
        assert_eq!(parsed.name, "widgets.test.js");
        assert_eq!(parsed.snapshots.len(), 2);
        assert_eq!(parsed.snapshots["widgets render: 1"].data, "<div>\n  hi\n</div>");
        assert_eq!(parsed.snapshots["widgets render: 2"].data, "42");
    }

    #[test]
    fn round_trips_payload_containing_fences() {
        let suite = suite_with(vec![snap("t: 1", "code:\n```js\nlet x = 1;\n```\ndone")]);
        let parsed = deserialize(&serialize(&suite));
        assert_eq!(parsed.snapshots["t: 1"].data, "code:\n```js\nlet x = 1;\n```\ndone");
    }

    #[test]
    fn preserves_language_tag() {
        let suite = suite_with(vec![Snapshot {
            name: "t: 1".into(),
            data: "<p/>".into(),
            lang: Some("html".into()),
        }]);
        let parsed = deserialize(&serialize(&suite));
        assert_eq!(parsed.snapshots["t: 1"].lang.as_deref(), Some("html"));
    }

    #[test]
    fn ignores_stray_prose_between_records() {
        let text = "# suite\n\nsome notes\n\n## a: 1\n\nmore notes\n\n```\npayload\n```\n";
        let parsed = deserialize(text);
        assert_eq!(parsed.name, "suite");
        assert_eq!(parsed.snapshots["a: 1"].data, "payload");
    }

    #[test]
    fn garbage_input_yields_empty_suite() {
        let parsed = deserialize("not a snapshot file\nat all\n");
        assert_eq!(parsed.name, "");
        assert!(parsed.snapshots.is_empty());
    }

    #[test]
    fn code_block_without_heading_is_dropped() {
        let parsed = deserialize("# suite\n\n```\norphan payload\n```\n");
        assert!(parsed.snapshots.is_empty());
    }

    #[test]
    fn unterminated_fence_keeps_collected_payload() {
        let parsed = deserialize("# s\n\n## t: 1\n\n```\nline one\nline two");
        assert_eq!(parsed.snapshots["t: 1"].data, "line one\nline two");
    }

    #[test]
    fn empty_payload_round_trips() {
        let suite = suite_with(vec![snap("t: 1", "")]);
        let parsed = deserialize(&serialize(&suite));
        assert_eq!(parsed.snapshots["t: 1"].data, "");
    }

    mod save {
        use super::*;
        use webrun_core::UpdatePolicy;

        fn summary_with(result: Vec<SerializedSnapshotSuite>, added: u32) -> SnapshotSummary {
            SnapshotSummary { added, result, ..SnapshotSummary::default() }
        }

        #[test]
        fn never_writes_when_policy_is_no() {
            let dir = tempfile::tempdir().unwrap();
            let summary = summary_with(vec![suite_with(vec![snap("t: 1", "x")])], 1);
            let wrote =
                save(|name| dir.path().join(format!("{name}.md")), &summary, UpdatePolicy::No)
                    .unwrap();
            assert!(!wrote);
            assert!(dir.path().read_dir().unwrap().next().is_none());
        }

        #[test]
        fn new_policy_skips_when_nothing_is_new() {
            let dir = tempfile::tempdir().unwrap();
            let summary = summary_with(vec![suite_with(vec![snap("t: 1", "x")])], 0);
            let wrote =
                save(|name| dir.path().join(format!("{name}.md")), &summary, UpdatePolicy::New)
                    .unwrap();
            assert!(!wrote);
        }

        #[test]
        fn new_policy_writes_added_snapshots() {
            let dir = tempfile::tempdir().unwrap();
            let summary = summary_with(vec![suite_with(vec![snap("t: 1", "x")])], 1);
            let path = dir.path().join("widgets.test.js.md");
            let wrote = save(|_| path.clone(), &summary, UpdatePolicy::New).unwrap();
            assert!(wrote);
            let written = fs::read_to_string(&path).unwrap();
            assert!(written.starts_with("# widgets.test.js\n"));
        }

        #[test]
        fn creates_missing_parent_directories() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested/deep/widgets.md");
            let summary = summary_with(vec![suite_with(vec![snap("t: 1", "x")])], 1);
            save(|_| path.clone(), &summary, UpdatePolicy::New).unwrap();
            assert!(path.exists());
        }

        #[test]
        fn empty_suite_deletes_its_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("stale.md");
            fs::write(&path, "# stale\n").unwrap();

            let mut summary = summary_with(vec![suite_with(vec![])], 1);
            summary.suites_removed = 1;
            let wrote = save(|_| path.clone(), &summary, UpdatePolicy::All).unwrap();
            assert!(wrote);
            assert!(!path.exists());
        }

        #[test]
        fn deleting_an_already_missing_file_is_tolerated() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("gone.md");
            let mut summary = summary_with(vec![suite_with(vec![])], 1);
            summary.suites_removed = 1;
            let wrote = save(|_| path.clone(), &summary, UpdatePolicy::All).unwrap();
            assert!(!wrote);
        }
    }
}
