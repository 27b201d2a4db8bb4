//! The fixed job sequences behind `gitai commit` and `gitai pr-review`.

use anyhow::{Result, anyhow, bail};
use tracing::{info, instrument};

use crate::jobs::{
    AutoStageAll, CodeReview, CommitMessage, CommitTitle, FeedbackOnCommit, Job, JobContext,
    PreCommitHook,
};

/// Stage (optional), run hooks, review (optional), then write and commit the message.
///
/// Fails before any model call when nothing is staged after staging and hooks,
/// or when every staged file is ignored.
#[instrument(skip_all)]
pub fn run_commit(ctx: &mut JobContext<'_>, pre_commit: bool) -> Result<CommitMessage> {
    AutoStageAll.perform(ctx)?;
    PreCommitHook {
        enabled: pre_commit,
    }
    .perform(ctx)?;
    if ctx.state.is_empty() {
        if !ctx.repo.staged_files()?.is_empty() {
            bail!("all staged files are ignored by .gitaiignore");
        }
        bail!("nothing staged to commit (stage files or pass --auto-stage-all)");
    }
    info!(staged = ctx.state.staged_files.len(), "staged changes ready");

    FeedbackOnCommit::default().perform(ctx)?;
    CommitTitle::default()
        .perform(ctx)?
        .ran()
        .ok_or_else(|| anyhow!("commit title job did not run"))
}

/// Review the current branch against the invocation's target branch.
#[instrument(skip_all)]
pub fn run_review(ctx: &mut JobContext<'_>) -> Result<String> {
    CodeReview::default()
        .perform(ctx)?
        .ran()
        .ok_or_else(|| anyhow!("code review job did not run"))
}
