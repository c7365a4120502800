//! Run configuration.
//!
//! The update policy mirrors the host runner's JSON config, where the value
//! is either the literal `false` or the strings `"new"` / `"all"`; the serde
//! impls preserve that wire form exactly.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Run-wide snapshot update mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Never persist; mismatches and unseen keys fail.
    No,
    /// Persist snapshots for keys never seen before; mismatches still fail.
    #[default]
    New,
    /// Rewrite mismatched snapshots in place and persist everything.
    All,
}

impl Serialize for UpdatePolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::No => serializer.serialize_bool(false),
            Self::New => serializer.serialize_str("new"),
            Self::All => serializer.serialize_str("all"),
        }
    }
}

impl<'de> Deserialize<'de> for UpdatePolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PolicyVisitor;

        impl Visitor<'_> for PolicyVisitor {
            type Value = UpdatePolicy;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("false, \"new\", or \"all\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                if v {
                    Err(E::custom("update policy `true` is not valid; use \"new\" or \"all\""))
                } else {
                    Ok(UpdatePolicy::No)
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v {
                    "new" => Ok(UpdatePolicy::New),
                    "all" => Ok(UpdatePolicy::All),
                    other => Err(E::custom(format!("unknown update policy {other:?}"))),
                }
            }
        }

        deserializer.deserialize_any(PolicyVisitor)
    }
}

/// Reporter configuration after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base directory of the project under test.
    pub root_dir: PathBuf,
    /// Directory holding the golden snapshot files, absolute.
    pub snapshot_dir: PathBuf,
    pub update: UpdatePolicy,
    /// Print every test line instead of only skipped/todo lines.
    pub verbose: bool,
}

pub const DEFAULT_SNAPSHOT_DIR: &str = "__snapshots__";

impl Config {
    /// Apply the defaulting rules of the host runner: relative snapshot
    /// paths resolve against `base_path`, and the update policy defaults to
    /// `New` in watch mode but `No` for single runs.
    #[must_use]
    pub fn normalize(
        base_path: &Path,
        single_run: bool,
        snapshot_dir: Option<PathBuf>,
        update: Option<UpdatePolicy>,
    ) -> Self {
        let snapshot_dir = snapshot_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR));
        let snapshot_dir = if snapshot_dir.is_absolute() {
            snapshot_dir
        } else {
            base_path.join(snapshot_dir)
        };

        Self {
            root_dir: base_path.to_path_buf(),
            snapshot_dir,
            update: update
                .unwrap_or(if single_run { UpdatePolicy::No } else { UpdatePolicy::New }),
            verbose: false,
        }
    }
}
