//! `pre-commit` hook execution.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{info, instrument, warn};

use super::git::Repository;
use super::process::run_command_with_timeout;

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Pass,
    Fail { output: String },
}

pub trait HookRunner {
    fn run(&self, files: &[String]) -> Result<HookOutcome>;
}

/// Runs `pre-commit run --files <files>` in the repository root.
#[derive(Debug, Clone)]
pub struct PreCommitRunner {
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl PreCommitRunner {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl HookRunner for PreCommitRunner {
    #[instrument(skip_all, fields(files = files.len()))]
    fn run(&self, files: &[String]) -> Result<HookOutcome> {
        let mut cmd = Command::new("pre-commit");
        cmd.args(["run", "--files"])
            .args(files)
            .current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        if output.success() {
            Ok(HookOutcome::Pass)
        } else {
            Ok(HookOutcome::Fail {
                output: output.combined_text(),
            })
        }
    }
}

/// Run the hooks; on failure re-stage `files` (hooks may have rewritten them)
/// and run once more. A second failure is fatal.
pub fn run_pre_commit_with_retry(
    hooks: &dyn HookRunner,
    repo: &dyn Repository,
    files: &[String],
) -> Result<()> {
    if files.is_empty() {
        info!("nothing staged, skipping pre-commit hooks");
        return Ok(());
    }
    if let HookOutcome::Fail { output } = hooks.run(files)? {
        warn!(output = %output.trim(), "pre-commit failed, re-staging and retrying once");
        repo.stage_files(files)?;
        if let HookOutcome::Fail { output } = hooks.run(files)? {
            bail!("pre-commit hooks failed twice:\n{}", output.trim());
        }
    }
    Ok(())
}
