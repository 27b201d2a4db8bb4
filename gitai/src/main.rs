//! gitai command-line interface.
//!
//! Every command runs inside a git repository and scaffolds `.gitai/` on the
//! way in. Model replies are shown on stdout and must be approved before they
//! are used.

use std::env;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gitai::customization::{CustomizationReport, customize_job, customize_llm, customize_template};
use gitai::exit_codes;
use gitai::io::init::init_gitai;
use gitai::io::operator::{Operator, TerminalOperator};
use gitai::jobs::builtin::DEFAULT_TARGET_BRANCH;
use gitai::jobs::{AUTO_STAGE_ALL, INCLUDE_AI_FEEDBACK, Invocation, USE_COMMIT_BODY};
use gitai::llm::BackendRegistry;
use gitai::pipeline::{run_commit, run_review};
use gitai::setup_branch::setup_branch;
use gitai::workspace::Workspace;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "gitai",
    version,
    about = "Commit messages and code reviews drafted by a language model"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draft a commit message for the staged changes and commit.
    Commit(CommitArgs),
    /// Review the current branch against a target branch.
    PrReview {
        /// Branch to diff against.
        #[arg(long, default_value = DEFAULT_TARGET_BRANCH)]
        target_branch: String,
    },
    /// Record the purpose and ticket link of the current branch.
    SetupBranch,
    /// Create `.gitai/` with default config and templates if missing.
    Setup,
    /// Override templates, jobs or backends for this repository.
    #[command(subcommand)]
    Customization(Customization),
}

#[derive(Args)]
struct CommitArgs {
    /// Also draft a commit body.
    #[arg(long)]
    use_commit_body: bool,
    /// Ask the model to review the staged changes first.
    #[arg(long)]
    include_ai_feedback: bool,
    /// Stage all changes (`git add -A`) before anything else.
    #[arg(long)]
    auto_stage_all: bool,
}

#[derive(Subcommand)]
enum Customization {
    /// Copy a job's templates into `.gitai/customization/templates/`.
    Template {
        /// Job type name, e.g. `CommitTitle`.
        #[arg(long)]
        llm_job_name: String,
        /// Only this role (`system`, `user` or `revision`).
        #[arg(long)]
        template_group: Option<String>,
    },
    /// Add a commented `[jobs.<Job>]` section to the local config.
    Job {
        #[arg(long)]
        name: String,
    },
    /// Declare an OpenAI-compatible backend in the local config.
    Llm {
        #[arg(long)]
        name: String,
    },
}

fn main() {
    gitai::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = env::current_dir().context("read current directory")?;
    let env_lookup = |key: &str| env::var(key).ok();
    let workspace = Workspace::open(&cwd, &env_lookup)?;
    let mut operator = TerminalOperator::stdio();

    match cli.command {
        Command::Commit(args) => cmd_commit(&workspace, &mut operator, &args, &env_lookup),
        Command::PrReview { target_branch } => {
            cmd_pr_review(&workspace, &mut operator, target_branch, &env_lookup)
        }
        Command::SetupBranch => {
            let now = chrono::Utc::now().timestamp();
            setup_branch(&workspace.git, &workspace.store, &mut operator, now).map(|_| ())
        }
        Command::Setup => {
            let paths = init_gitai(workspace.root())?;
            operator.notify(&format!("gitai is set up in {}", paths.gitai_dir.display()))
        }
        Command::Customization(which) => {
            let report = match which {
                Customization::Template {
                    llm_job_name,
                    template_group,
                } => customize_template(
                    &workspace.paths,
                    &llm_job_name,
                    template_group.as_deref(),
                )?,
                Customization::Job { name } => customize_job(&workspace.paths, &name)?,
                Customization::Llm { name } => customize_llm(&workspace.paths, &name)?,
            };
            report_customization(&workspace, &mut operator, &report)
        }
    }
}

fn cmd_commit(
    workspace: &Workspace,
    operator: &mut dyn Operator,
    args: &CommitArgs,
    env_lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    let invocation = Invocation::default()
        .with_flag(USE_COMMIT_BODY, args.use_commit_body)
        .with_flag(INCLUDE_AI_FEEDBACK, args.include_ai_feedback)
        .with_flag(AUTO_STAGE_ALL, args.auto_stage_all);
    debug!(?invocation, "commit");
    let backends = BackendRegistry::from_config(&workspace.config, env_lookup)?;
    let hooks = workspace.hook_runner();
    let pre_commit = workspace.pre_commit_enabled()?;

    let mut ctx = workspace.job_context(&invocation, &backends, operator, &hooks)?;
    let message = run_commit(&mut ctx, pre_commit)?;
    ctx.operator.notify(&format!("Committed: {}", message.title))
}

fn cmd_pr_review(
    workspace: &Workspace,
    operator: &mut dyn Operator,
    target_branch: String,
    env_lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    let invocation = Invocation::default().with_target_branch(target_branch);
    let backends = BackendRegistry::from_config(&workspace.config, env_lookup)?;
    let hooks = workspace.hook_runner();

    let mut ctx = workspace.job_context(&invocation, &backends, operator, &hooks)?;
    let review = run_review(&mut ctx)?;
    ctx.operator.present("code_review (approved)", &review)
}

fn report_customization(
    workspace: &Workspace,
    operator: &mut dyn Operator,
    report: &CustomizationReport,
) -> Result<()> {
    for path in &report.written {
        operator.notify(&format!("Created {}", workspace.paths.relative(path)))?;
    }
    if let Some(section) = &report.config_section {
        operator.notify(&format!(
            "Added [{section}] to {}",
            workspace.paths.relative(&workspace.paths.config_path)
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn commit_flags_default_to_false() {
        let cli = Cli::try_parse_from(["gitai", "commit", "--use-commit-body"]).expect("parse");
        let Command::Commit(args) = cli.command else {
            panic!("expected commit");
        };
        assert!(args.use_commit_body);
        assert!(!args.include_ai_feedback);
        assert!(!args.auto_stage_all);
    }

    #[test]
    fn pr_review_targets_main_by_default() {
        let cli = Cli::try_parse_from(["gitai", "pr-review"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::PrReview { ref target_branch } if target_branch == "main"
        ));
    }

    #[test]
    fn customization_template_takes_optional_group() {
        let cli = Cli::try_parse_from([
            "gitai",
            "customization",
            "template",
            "--llm-job-name",
            "CommitTitle",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Customization(Customization::Template {
                ref llm_job_name,
                template_group: None,
            }) if llm_job_name == "CommitTitle"
        ));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["gitai", "push"]).is_err());
    }
}
