//! Snapshot of what is staged.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use super::git::Repository;
use crate::core::ignore::filter_ignored;

/// Staged files (minus ignored ones) and their per-file staged diffs.
///
/// Captured once per pipeline and re-captured explicitly after every
/// mutating git operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitState {
    pub staged_files: Vec<String>,
    pub diffs: BTreeMap<String, String>,
}

impl GitState {
    pub fn capture(repo: &dyn Repository, ignore_patterns: &[String]) -> Result<Self> {
        let staged_files = filter_ignored(repo.staged_files()?, ignore_patterns);
        let mut diffs = BTreeMap::new();
        for file in &staged_files {
            let diff = repo
                .diff(Some(file))
                .with_context(|| format!("diff staged file {file}"))?;
            diffs.insert(file.clone(), diff);
        }
        debug!(staged = staged_files.len(), "captured git state");
        Ok(Self {
            staged_files,
            diffs,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.staged_files.is_empty()
    }

    /// The per-file diff map as a JSON object, the form templates receive.
    pub fn diff_json(&self) -> Result<String> {
        serde_json::to_string(&self.diffs).context("serialize staged diffs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRepo;

    #[test]
    fn ignored_files_have_no_diff_entry() {
        let repo = RecordingRepo::with_staged(&[("a.lock", "lock diff"), ("b.py", "py diff")]);

        let state = GitState::capture(&repo, &["*.lock".to_string()]).expect("capture");

        assert_eq!(state.staged_files, vec!["b.py"]);
        assert_eq!(state.diffs.len(), 1);
        assert_eq!(state.diff_json().expect("json"), r#"{"b.py":"py diff"}"#);
    }

    #[test]
    fn nothing_staged_is_empty() {
        let repo = RecordingRepo::with_staged(&[]);
        let state = GitState::capture(&repo, &[]).expect("capture");
        assert!(state.is_empty());
        assert_eq!(state.diff_json().expect("json"), "{}");
    }
}
