//! Units of work composed by the command pipelines.
//!
//! A job may name a boolean gating flag; it runs only when the invocation
//! carries that flag set to `true`. Jobs are built fresh for each pipeline
//! run and keep no state between invocations.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::io::branch_store::BranchStore;
use crate::io::config::GitaiConfig;
use crate::io::git::Repository;
use crate::io::git_state::GitState;
use crate::io::hooks::HookRunner;
use crate::io::operator::Operator;
use crate::llm::BackendRegistry;

pub mod builtin;
pub mod kind;
pub mod llm_job;

pub use builtin::{
    AutoStageAll, CodeReview, CommitBody, CommitMessage, CommitTitle, FeedbackOnCommit,
    PreCommitHook,
};
pub use kind::LlmJobKind;
pub use llm_job::LlmJob;

pub const AUTO_STAGE_ALL: &str = "auto_stage_all";
pub const USE_COMMIT_BODY: &str = "use_commit_body";
pub const INCLUDE_AI_FEEDBACK: &str = "include_ai_feedback";

/// Command-line values a pipeline was started with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub flags: BTreeMap<String, bool>,
    pub target_branch: Option<String>,
}

impl Invocation {
    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }

    pub fn with_target_branch(mut self, branch: impl Into<String>) -> Self {
        self.target_branch = Some(branch.into());
        self
    }

    /// False when the flag is unset.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

/// Everything a job may read or drive while it runs.
pub struct JobContext<'a> {
    pub invocation: &'a Invocation,
    pub config: &'a GitaiConfig,
    /// Repository top-level directory.
    pub root: &'a Path,
    pub repo: &'a dyn Repository,
    pub store: &'a BranchStore,
    pub backends: &'a BackendRegistry,
    pub operator: &'a mut dyn Operator,
    pub hooks: &'a dyn HookRunner,
    pub ignore_patterns: Vec<String>,
    pub state: GitState,
}

impl JobContext<'_> {
    /// Re-read staged files and diffs after a mutating git operation.
    pub fn refresh_state(&mut self) -> Result<()> {
        self.state = GitState::capture(self.repo, &self.ignore_patterns)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Ran(T),
    Skipped,
}

impl<T> JobOutcome<T> {
    pub fn ran(self) -> Option<T> {
        match self {
            JobOutcome::Ran(value) => Some(value),
            JobOutcome::Skipped => None,
        }
    }
}

pub trait Job {
    type Output;

    fn name(&self) -> &'static str;

    /// Flag that must be set for the job to run; `None` means always run.
    fn gating_flag(&self) -> Option<&'static str> {
        None
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<Self::Output>;

    /// Gate-checked entry point. A skipped job has no side effects.
    fn perform(&self, ctx: &mut JobContext<'_>) -> Result<JobOutcome<Self::Output>> {
        if let Some(flag) = self.gating_flag()
            && !ctx.invocation.flag(flag)
        {
            debug!(job = self.name(), flag, "gating flag not set, skipping");
            return Ok(JobOutcome::Skipped);
        }
        debug!(job = self.name(), "running job");
        self.exec(ctx).map(JobOutcome::Ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flag_reads_false() {
        let invocation = Invocation::default().with_flag(USE_COMMIT_BODY, true);
        assert!(invocation.flag(USE_COMMIT_BODY));
        assert!(!invocation.flag(INCLUDE_AI_FEEDBACK));
    }

    #[test]
    fn skipped_outcome_has_no_value() {
        assert_eq!(JobOutcome::<u8>::Skipped.ran(), None);
        assert_eq!(JobOutcome::Ran(3).ran(), Some(3));
    }
}
