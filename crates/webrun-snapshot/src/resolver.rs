//! Per-client snapshot file paths.
//!
//! The store is shared across runs but partitioned by client identity, so
//! concurrently running clients never write to the same file. A suite named
//! `src/widgets.test.js` reported by client `chrome` persists to
//! `<snapshot_dir>/widgets.test.js__chrome.md`.

use std::path::{Path, PathBuf};

const SNAPSHOT_EXT: &str = ".md";

/// Path of the golden file for `suite_name` in `client`'s partition.
#[must_use]
pub fn resolve_snapshot_path(snapshot_dir: &Path, suite_name: &str, client: &str) -> PathBuf {
    let base = Path::new(suite_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| suite_name.to_string());

    snapshot_dir.join(format!("{base}__{client}{SNAPSHOT_EXT}"))
}

/// Inverse of [`resolve_snapshot_path`]: recover the suite base name from a
/// partitioned snapshot file path. Returns `None` when the file does not
/// belong to `client`'s partition.
#[must_use]
pub fn resolve_suite_name(snapshot_path: &Path, client: &str) -> Option<String> {
    let file = snapshot_path.file_name()?.to_str()?;
    let suffix = format!("__{client}{SNAPSHOT_EXT}");
    file.strip_suffix(&suffix).map(ToString::to_string)
}
