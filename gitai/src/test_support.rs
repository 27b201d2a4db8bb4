//! Test doubles for the operator, language models, transport, git and hooks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::rc::Rc;

use anyhow::{Result, bail};
use serde_json::Value;

use crate::core::prompt::{Prompt, PromptLine};
use crate::error::LlmError;
use crate::io::branch_store::BranchStore;
use crate::io::config::{GitaiConfig, load_config};
use crate::io::git::Repository;
use crate::io::hooks::{HookOutcome, HookRunner};
use crate::io::init::{GitaiPaths, init_gitai};
use crate::io::operator::Operator;
use crate::llm::client::{HttpRequest, Transport};
use crate::llm::{Completion, LanguageModel};

/// Operator that answers from a script and records what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    presented: Vec<(String, String)>,
    questions: Vec<String>,
    notices: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I>(answers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// `(label, text)` pairs in presentation order.
    pub fn presented(&self) -> Vec<(String, String)> {
        self.presented.clone()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.clone()
    }
}

impl Operator for ScriptedOperator {
    fn present(&mut self, label: &str, text: &str) -> Result<()> {
        self.presented.push((label.to_string(), text.to_string()));
        Ok(())
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.questions.push(question.to_string());
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("operator input closed while waiting for an answer to: {question}"),
        }
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.notices.push(message.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StubState {
    replies: VecDeque<String>,
    prompts: Vec<Prompt>,
}

/// Language model with canned replies. Clones share their replies and history.
#[derive(Debug, Clone)]
pub struct StubModel {
    name: String,
    state: Rc<RefCell<StubState>>,
}

impl StubModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::named("stub", replies)
    }

    pub fn named<I>(name: &str, replies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.to_string(),
            state: Rc::new(RefCell::new(StubState {
                replies: replies.into_iter().map(Into::into).collect(),
                prompts: Vec::new(),
            })),
        }
    }

    pub fn calls(&self) -> usize {
        self.state.borrow().prompts.len()
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.state.borrow().prompts.clone()
    }
}

impl LanguageModel for StubModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, prompt: &Prompt, _model: &str) -> Result<Completion, LlmError> {
        let mut state = self.state.borrow_mut();
        state.prompts.push(prompt.clone());
        let reply = state.replies.pop_front().ok_or_else(|| {
            LlmError::MalformedResponse(format!("stub `{}` has no reply left", self.name))
        })?;
        Ok(Completion {
            conversation: prompt.clone().appended(PromptLine::assistant(reply.clone())),
            reply,
        })
    }
}

/// Transport that returns scripted JSON bodies and records requests.
#[derive(Debug, Default)]
pub struct CountingTransport {
    responses: RefCell<VecDeque<Value>>,
    failure: Option<(u16, String)>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl CountingTransport {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            ..Self::default()
        }
    }

    /// Every request fails with `status`.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for CountingTransport {
    fn post_json(&self, request: &HttpRequest) -> Result<Value, LlmError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some((status, body)) = &self.failure {
            return Err(LlmError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| LlmError::MalformedResponse("no scripted response left".to_string()))
    }
}

/// Arguments of one `diff_between_branches` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchDiffCall {
    pub base: String,
    pub head: String,
    pub context_lines: u32,
    pub excludes: Vec<String>,
}

/// In-memory [`Repository`] that records staging and commits.
///
/// `stage_files(["-A"])` moves the unstaged entries into the index; a commit
/// empties the index.
#[derive(Debug)]
pub struct RecordingRepo {
    branch: String,
    staged: RefCell<Vec<(String, String)>>,
    unstaged: RefCell<Vec<(String, String)>>,
    branch_diff: String,
    staged_batches: RefCell<Vec<Vec<String>>>,
    commits: RefCell<Vec<(String, Option<String>)>>,
    branch_diff_calls: RefCell<Vec<BranchDiffCall>>,
}

impl RecordingRepo {
    /// Index holding `(path, diff)` pairs, on branch `main`.
    pub fn with_staged(files: &[(&str, &str)]) -> Self {
        Self {
            branch: "main".to_string(),
            staged: RefCell::new(owned_pairs(files)),
            unstaged: RefCell::new(Vec::new()),
            branch_diff: String::new(),
            staged_batches: RefCell::new(Vec::new()),
            commits: RefCell::new(Vec::new()),
            branch_diff_calls: RefCell::new(Vec::new()),
        }
    }

    pub fn on_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    /// Worktree changes picked up by `git add -A`.
    pub fn with_unstaged(self, files: &[(&str, &str)]) -> Self {
        *self.unstaged.borrow_mut() = owned_pairs(files);
        self
    }

    pub fn with_branch_diff(mut self, diff: &str) -> Self {
        self.branch_diff = diff.to_string();
        self
    }

    pub fn staged_batches(&self) -> Vec<Vec<String>> {
        self.staged_batches.borrow().clone()
    }

    /// `(title, body)` of each commit.
    pub fn commits(&self) -> Vec<(String, Option<String>)> {
        self.commits.borrow().clone()
    }

    pub fn branch_diff_calls(&self) -> Vec<BranchDiffCall> {
        self.branch_diff_calls.borrow().clone()
    }
}

fn owned_pairs(files: &[(&str, &str)]) -> Vec<(String, String)> {
    files
        .iter()
        .map(|(path, diff)| (path.to_string(), diff.to_string()))
        .collect()
}

impl Repository for RecordingRepo {
    fn staged_files(&self) -> Result<Vec<String>> {
        Ok(self
            .staged
            .borrow()
            .iter()
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn diff(&self, path: Option<&str>) -> Result<String> {
        let staged = self.staged.borrow();
        let diffs = staged
            .iter()
            .filter(|(file, _)| path.is_none_or(|wanted| *file == wanted))
            .map(|(_, diff)| diff.as_str())
            .collect::<Vec<_>>();
        Ok(diffs.join("\n"))
    }

    fn diff_between_branches(
        &self,
        base: &str,
        head: &str,
        context_lines: u32,
        excludes: &[String],
    ) -> Result<String> {
        self.branch_diff_calls.borrow_mut().push(BranchDiffCall {
            base: base.to_string(),
            head: head.to_string(),
            context_lines,
            excludes: excludes.to_vec(),
        });
        Ok(self.branch_diff.clone())
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn stage_files(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.staged_batches.borrow_mut().push(paths.to_vec());
        if paths.iter().any(|path| path == "-A") {
            let moved: Vec<_> = self.unstaged.borrow_mut().drain(..).collect();
            self.staged.borrow_mut().extend(moved);
        }
        Ok(())
    }

    fn commit(&self, title: &str, body: Option<&str>) -> Result<()> {
        if self.staged.borrow().is_empty() {
            bail!("nothing to commit");
        }
        self.commits
            .borrow_mut()
            .push((title.to_string(), body.map(str::to_string)));
        self.staged.borrow_mut().clear();
        Ok(())
    }
}

/// Hook runner returning scripted outcomes, then `Pass`.
#[derive(Debug, Default)]
pub struct ScriptedHookRunner {
    outcomes: RefCell<VecDeque<HookOutcome>>,
    runs: Cell<usize>,
}

impl ScriptedHookRunner {
    pub fn new(outcomes: Vec<HookOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            runs: Cell::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl HookRunner for ScriptedHookRunner {
    fn run(&self, _files: &[String]) -> Result<HookOutcome> {
        self.runs.set(self.runs.get() + 1);
        Ok(self
            .outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(HookOutcome::Pass))
    }
}

/// A temporary repository root with `.gitai/` scaffolded and its config loaded.
///
/// No git repository is created; pair it with a [`RecordingRepo`].
pub struct Scaffold {
    pub temp: tempfile::TempDir,
    pub paths: GitaiPaths,
    pub config: GitaiConfig,
    pub store: BranchStore,
}

impl Scaffold {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_gitai(temp.path()).expect("init gitai");
        let config = load_config(std::slice::from_ref(&paths.config_path)).expect("load config");
        let store = BranchStore::in_memory().expect("branch store");
        Self {
            temp,
            paths,
            config,
            store,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }
}

impl Default for Scaffold {
    fn default() -> Self {
        Self::new()
    }
}

/// Run git in `root`, panicking on failure. Returns stdout.
pub fn git(root: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// `git init` with an identity and one commit on `main`.
pub fn init_git_repo(root: &Path) {
    git(root, &["init", "-q"]);
    git(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(root, &["config", "user.email", "gitai@example.com"]);
    git(root, &["config", "user.name", "gitai tests"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    std::fs::write(root.join("README.md"), "# test\n").expect("write README");
    git(root, &["add", "README.md"]);
    git(root, &["commit", "-q", "-m", "Initial commit"]);
}
