//! Everything a command needs from the repository it runs in.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::ignore::parse_ignore_file;
use crate::io::branch_store::BranchStore;
use crate::io::config::{GitaiConfig, config_paths, load_config};
use crate::io::git::Git;
use crate::io::git_state::GitState;
use crate::io::hooks::{HookRunner, PreCommitRunner};
use crate::io::init::{GitaiPaths, init_gitai};
use crate::io::operator::Operator;
use crate::jobs::{Invocation, JobContext};
use crate::llm::BackendRegistry;

/// An initialized repository with its merged config and branch store.
pub struct Workspace {
    pub paths: GitaiPaths,
    pub git: Git,
    pub config: GitaiConfig,
    pub store: BranchStore,
    pub ignore_patterns: Vec<String>,
}

impl Workspace {
    /// Find the repository containing `cwd`, scaffold `.gitai/` if needed and
    /// load its configuration.
    #[instrument(skip_all, fields(cwd = %cwd.display()))]
    pub fn open(cwd: &Path, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let git = Git::discover(cwd)?;
        let root = git.workdir().to_path_buf();
        let paths = init_gitai(&root)?;

        let mut config = load_config(&config_paths(&root, &paths.config_path))?;
        config.apply_env_overrides(env)?;
        config.validate()?;

        let store = BranchStore::open(&paths.db_path)
            .with_context(|| format!("open {}", paths.db_path.display()))?;
        let ignore_patterns = read_ignore_patterns(&root.join(&config.git.ignore_file))?;
        info!(root = %root.display(), ignored = ignore_patterns.len(), "workspace ready");

        Ok(Self {
            paths,
            git,
            config,
            store,
            ignore_patterns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    /// `[git].pre_commit` when set, otherwise whether a pre-commit hook is installed.
    pub fn pre_commit_enabled(&self) -> Result<bool> {
        if let Some(enabled) = self.config.git.pre_commit {
            return Ok(enabled);
        }
        let hook = self.git.hook_path("pre-commit")?;
        debug!(hook = %hook.display(), "checking for pre-commit hook");
        Ok(hook.is_file())
    }

    pub fn hook_runner(&self) -> PreCommitRunner {
        PreCommitRunner::new(
            self.root().to_path_buf(),
            Duration::from_secs(self.config.git.pre_commit_timeout_secs),
        )
    }

    /// A job context over this workspace with freshly captured git state.
    pub fn job_context<'a>(
        &'a self,
        invocation: &'a Invocation,
        backends: &'a BackendRegistry,
        operator: &'a mut dyn Operator,
        hooks: &'a dyn HookRunner,
    ) -> Result<JobContext<'a>> {
        let state = GitState::capture(&self.git, &self.ignore_patterns)?;
        Ok(JobContext {
            invocation,
            config: &self.config,
            root: self.root(),
            repo: &self.git,
            store: &self.store,
            backends,
            operator,
            hooks,
            ignore_patterns: self.ignore_patterns.clone(),
            state,
        })
    }
}

fn read_ignore_patterns(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(parse_ignore_file(&contents))
}
