//! Output of the code-transformation engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a file was touched by a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    /// New file
    Added,
    /// Existing file rewritten
    Modified,
    /// File removed
    Deleted,
}

/// One changed file, relative to the checkout root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the checkout
    pub path: PathBuf,
    /// Kind of change
    pub kind: ChangeKind,
}

/// Files changed by a transformation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Changed files
    #[serde(default)]
    pub files: Vec<FileChange>,
}

impl ChangeSet {
    /// True when the engine changed nothing.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of changed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Count of changes of one kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.files.iter().filter(|f| f.kind == kind).count()
    }
}

/// Structured report produced alongside a change-set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    /// Directives the engine actually applied
    #[serde(default)]
    pub directives_applied: Vec<String>,
    /// Files the engine modified
    #[serde(default)]
    pub files_modified: u32,
    /// Issues fixed along the way
    #[serde(default)]
    pub issues_fixed: u32,
    /// Free-form engine notes
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Everything a successful transformation returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    /// Files changed
    #[serde(default)]
    pub change_set: ChangeSet,
    /// Engine report
    #[serde(default)]
    pub report: TransformReport,
}
