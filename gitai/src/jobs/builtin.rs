//! The jobs behind `commit` and `pr-review`.

use anyhow::{Result, bail};
use tracing::{debug, info};

use super::kind::LlmJobKind;
use super::llm_job::LlmJob;
use super::{AUTO_STAGE_ALL, Job, JobContext};
use crate::io::hooks::run_pre_commit_with_retry;
use crate::io::templates::TemplateContext;

pub const DEFAULT_TARGET_BRANCH: &str = "main";

/// `git add -A`, gated by `auto_stage_all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoStageAll;

impl Job for AutoStageAll {
    type Output = ();

    fn name(&self) -> &'static str {
        "AutoStageAll"
    }

    fn gating_flag(&self) -> Option<&'static str> {
        Some(AUTO_STAGE_ALL)
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<()> {
        ctx.repo.stage_files(&["-A".to_string()])?;
        ctx.refresh_state()
    }
}

/// Run `pre-commit` over the staged files when the repository uses it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreCommitHook {
    pub enabled: bool,
}

impl Job for PreCommitHook {
    type Output = ();

    fn name(&self) -> &'static str {
        "PreCommitHook"
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<()> {
        if !self.enabled {
            debug!("pre-commit not enabled for this repository");
            return Ok(());
        }
        let files = ctx.state.staged_files.clone();
        run_pre_commit_with_retry(ctx.hooks, ctx.repo, &files)?;
        ctx.refresh_state()
    }
}

/// Review of the staged changes before committing, gated by `include_ai_feedback`.
#[derive(Debug, Clone)]
pub struct FeedbackOnCommit(pub LlmJob);

impl Default for FeedbackOnCommit {
    fn default() -> Self {
        Self(LlmJob::new(LlmJobKind::FeedbackOnCommit))
    }
}

impl Job for FeedbackOnCommit {
    type Output = String;

    fn name(&self) -> &'static str {
        LlmJobKind::FeedbackOnCommit.type_name()
    }

    fn gating_flag(&self) -> Option<&'static str> {
        LlmJobKind::FeedbackOnCommit.gating_flag()
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<String> {
        let diff = ctx.state.diff_json()?;
        self.0.perform_base(ctx, diff, TemplateContext::new())
    }
}

/// Commit message body, gated by `use_commit_body`.
#[derive(Debug, Clone)]
pub struct CommitBody(pub LlmJob);

impl Default for CommitBody {
    fn default() -> Self {
        Self(LlmJob::new(LlmJobKind::CommitBody))
    }
}

impl Job for CommitBody {
    type Output = String;

    fn name(&self) -> &'static str {
        LlmJobKind::CommitBody.type_name()
    }

    fn gating_flag(&self) -> Option<&'static str> {
        LlmJobKind::CommitBody.gating_flag()
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<String> {
        let diff = ctx.state.diff_json()?;
        self.0.perform_base(ctx, diff, TemplateContext::new())
    }
}

/// The message that was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub title: String,
    pub body: Option<String>,
}

/// Commit title. Runs [`CommitBody`] first, then commits title and body.
#[derive(Debug, Clone)]
pub struct CommitTitle {
    pub job: LlmJob,
    pub body: CommitBody,
}

impl Default for CommitTitle {
    fn default() -> Self {
        Self {
            job: LlmJob::new(LlmJobKind::CommitTitle),
            body: CommitBody::default(),
        }
    }
}

impl Job for CommitTitle {
    type Output = CommitMessage;

    fn name(&self) -> &'static str {
        LlmJobKind::CommitTitle.type_name()
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<CommitMessage> {
        let body = self.body.perform(ctx)?.ran();
        let diff = ctx.state.diff_json()?;
        let extra = TemplateContext::from([(
            "body".to_string(),
            body.clone().unwrap_or_default(),
        )]);
        let title = self.job.perform_base(ctx, diff, extra)?;
        let title = title.trim().to_string();
        if title.is_empty() {
            bail!("approved commit title is empty");
        }

        ctx.repo.commit(&title, body.as_deref())?;
        info!(title = %title, with_body = body.is_some(), "committed");
        ctx.refresh_state()?;
        Ok(CommitMessage { title, body })
    }
}

/// Review of the current branch against a target branch.
#[derive(Debug, Clone)]
pub struct CodeReview(pub LlmJob);

impl Default for CodeReview {
    fn default() -> Self {
        Self(LlmJob::new(LlmJobKind::CodeReview))
    }
}

impl Job for CodeReview {
    type Output = String;

    fn name(&self) -> &'static str {
        LlmJobKind::CodeReview.type_name()
    }

    fn exec(&self, ctx: &mut JobContext<'_>) -> Result<String> {
        let target = ctx
            .invocation
            .target_branch
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET_BRANCH.to_string());
        let current = ctx.repo.current_branch()?;
        let diff = ctx.repo.diff_between_branches(
            &target,
            &current,
            ctx.config.general.diff_context_lines,
            &ctx.ignore_patterns,
        )?;
        if diff.trim().is_empty() {
            bail!("no differences between {target} and {current}");
        }
        self.0.perform_base(ctx, diff, TemplateContext::new())
    }
}
