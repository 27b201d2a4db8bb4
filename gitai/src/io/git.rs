//! Git adapter.
//!
//! git is driven as a subprocess. Jobs depend on the [`Repository`] trait so
//! pipelines can be exercised without a real repository.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument, warn};

/// The git operations jobs need.
pub trait Repository {
    /// Paths with staged changes, in git's order.
    fn staged_files(&self) -> Result<Vec<String>>;

    /// Staged diff, for one path or for everything.
    fn diff(&self, path: Option<&str>) -> Result<String>;

    /// `git diff <base> <head>` restricted to the worktree minus `excludes`.
    fn diff_between_branches(
        &self,
        base: &str,
        head: &str,
        context_lines: u32,
        excludes: &[String],
    ) -> Result<String>;

    fn current_branch(&self) -> Result<String>;

    fn stage_files(&self, paths: &[String]) -> Result<()>;

    /// Commit what is staged. An empty or absent body produces a title-only message.
    fn commit(&self, title: &str, body: Option<&str>) -> Result<()>;
}

/// Runs `git` in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Open the repository containing `dir`, rooted at its top-level directory.
    pub fn discover(dir: &Path) -> Result<Self> {
        let nested = Self::new(dir);
        let toplevel = nested
            .toplevel()
            .with_context(|| format!("{} is not inside a git repository", dir.display()))?;
        Ok(Self::new(toplevel))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn toplevel(&self) -> Result<PathBuf> {
        let out = self.run_capture(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Location of a hook script, honouring `core.hooksPath`.
    pub fn hook_path(&self, name: &str) -> Result<PathBuf> {
        let out = self.run_capture(&["rev-parse", "--git-path", &format!("hooks/{name}")])?;
        Ok(self.workdir.join(out.trim()))
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(cmd = %format!("git {}", args.join(" ")), "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl Repository for Git {
    #[instrument(skip_all)]
    fn staged_files(&self) -> Result<Vec<String>> {
        let out = self.run_capture(&["diff", "--name-only", "--cached", "-z"])?;
        let files = parse_name_list(&out);
        debug!(count = files.len(), "staged files");
        Ok(files)
    }

    fn diff(&self, path: Option<&str>) -> Result<String> {
        let mut args = vec!["diff", "--cached"];
        if let Some(path) = path {
            args.extend(["--", path]);
        }
        self.run_capture(&args)
    }

    #[instrument(skip_all, fields(base = %base, head = %head))]
    fn diff_between_branches(
        &self,
        base: &str,
        head: &str,
        context_lines: u32,
        excludes: &[String],
    ) -> Result<String> {
        let args = branch_diff_args(base, head, context_lines, excludes);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let diff = self.run_capture(&args)?;
        debug!(bytes = diff.len(), "branch diff");
        Ok(diff)
    }

    #[instrument(skip_all)]
    fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["branch", "--show-current"])?;
        let name = out.trim().to_string();
        if name.is_empty() {
            warn!("detached HEAD detected");
            bail!("detached HEAD (no current branch)");
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    #[instrument(skip_all, fields(count = paths.len()))]
    fn stage_files(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add"];
        args.extend(paths.iter().map(String::as_str));
        self.run_checked(&args)?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, title: &str, body: Option<&str>) -> Result<()> {
        let args = commit_args(title, body);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_checked(&args)?;
        debug!(title, "committed");
        Ok(())
    }
}

/// Arguments of `git diff` between two branches with pathspec excludes.
pub fn branch_diff_args(
    base: &str,
    head: &str,
    context_lines: u32,
    excludes: &[String],
) -> Vec<String> {
    let mut args = vec![
        "diff".to_string(),
        base.to_string(),
        head.to_string(),
        format!("-U{context_lines}"),
        "--".to_string(),
        ".".to_string(),
    ];
    args.extend(excludes.iter().map(|pattern| format!(":(exclude){pattern}")));
    args
}

fn commit_args(title: &str, body: Option<&str>) -> Vec<String> {
    let mut args = vec!["commit".to_string(), "-m".to_string(), title.to_string()];
    if let Some(body) = body.filter(|body| !body.trim().is_empty()) {
        args.extend(["-m".to_string(), body.to_string()]);
    }
    args
}

/// Split `-z` output. Paths are verbatim, never C-quoted.
fn parse_name_list(out: &str) -> Vec<String> {
    out.split('\0')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::git_state::GitState;
    use crate::test_support::{git, init_git_repo};
    use std::fs;

    #[test]
    fn branch_diff_excludes_ignored_patterns() {
        let args = branch_diff_args("main", "feature", 10, &["*.lock".to_string()]);
        assert_eq!(
            args,
            vec!["diff", "main", "feature", "-U10", "--", ".", ":(exclude)*.lock"]
        );
    }

    #[test]
    fn commit_body_is_a_second_message() {
        assert_eq!(commit_args("Fix bug", None), vec!["commit", "-m", "Fix bug"]);
        assert_eq!(commit_args("Fix bug", Some("  ")), vec!["commit", "-m", "Fix bug"]);
        assert_eq!(
            commit_args("Fix bug", Some("Details")),
            vec!["commit", "-m", "Fix bug", "-m", "Details"]
        );
    }

    #[test]
    fn name_list_splits_on_nul() {
        assert_eq!(
            parse_name_list("a.rs\0dir/b c.rs\0\0"),
            vec!["a.rs", "dir/b c.rs"]
        );
        assert!(parse_name_list("").is_empty());
    }

    #[test]
    fn stage_diff_and_commit_in_real_repo() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_git_repo(temp.path());
        let repo = Git::discover(temp.path()).expect("discover");

        fs::write(temp.path().join("notes.txt"), "hello\n").expect("write");
        repo.stage_files(&["notes.txt".to_string()]).expect("stage");

        assert_eq!(repo.staged_files().expect("staged"), vec!["notes.txt"]);
        assert!(repo.diff(Some("notes.txt")).expect("diff").contains("+hello"));

        repo.commit("Add notes", Some("Body text")).expect("commit");
        assert!(repo.staged_files().expect("staged").is_empty());
        let log = git(temp.path(), &["log", "-1", "--format=%s%n%b"]);
        assert!(log.starts_with("Add notes\n"));
        assert!(log.contains("Body text"));
    }

    #[test]
    fn non_ascii_paths_are_listed_verbatim() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_git_repo(temp.path());
        let repo = Git::discover(temp.path()).expect("discover");

        fs::write(temp.path().join("änderung.txt"), "hello\n").expect("write");
        repo.stage_files(&["änderung.txt".to_string()]).expect("stage");

        assert_eq!(repo.staged_files().expect("staged"), vec!["änderung.txt"]);
        assert!(repo.diff(Some("änderung.txt")).expect("diff").contains("+hello"));

        let state = GitState::capture(&repo, &[]).expect("capture");
        assert_eq!(state.staged_files, vec!["änderung.txt"]);
        assert!(state.diffs["änderung.txt"].contains("+hello"));
    }

    #[test]
    fn branch_diff_compares_branches() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_git_repo(temp.path());
        let repo = Git::new(temp.path());
        let base = repo.current_branch().expect("branch");

        git(temp.path(), &["checkout", "-b", "feature"]);
        fs::write(temp.path().join("app.py"), "print('hi')\n").expect("write");
        fs::write(temp.path().join("deps.lock"), "pinned\n").expect("write");
        git(temp.path(), &["add", "-A"]);
        git(temp.path(), &["commit", "-m", "feature work"]);

        let diff = repo
            .diff_between_branches(&base, "feature", 3, &["*.lock".to_string()])
            .expect("diff");
        assert!(diff.contains("app.py"));
        assert!(!diff.contains("deps.lock"));
    }
}
