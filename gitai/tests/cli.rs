//! Spawns the gitai binary and checks argument handling, scaffolding and exit codes.

use std::fs;
use std::process::{Command, Output};

use gitai::exit_codes;
use gitai::test_support::init_git_repo;

fn gitai(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gitai"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn gitai")
}

#[test]
fn help_lists_commands() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = gitai(temp.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["commit", "pr-review", "setup-branch", "setup", "customization"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn setup_scaffolds_gitai_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_git_repo(temp.path());

    let output = gitai(temp.path(), &["setup"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let gitai_dir = temp.path().join(".gitai");
    assert_eq!(
        fs::read_to_string(gitai_dir.join(".gitignore")).expect("gitignore"),
        "# Created by gitai automatically.\n*\n"
    );
    assert!(gitai_dir.join("config.toml").is_file());
    assert!(gitai_dir.join("gitai.sqlite3").is_file());
    assert!(gitai_dir.join("templates/commit_title_revision.txt").is_file());
}

#[test]
fn setup_keeps_edited_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_git_repo(temp.path());
    assert!(gitai(temp.path(), &["setup"]).status.success());
    let template = temp.path().join(".gitai/templates/code_review_system.txt");
    fs::write(&template, "Be brief.").expect("edit template");

    assert!(gitai(temp.path(), &["setup"]).status.success());

    assert_eq!(fs::read_to_string(&template).expect("template"), "Be brief.");
}

#[test]
fn outside_a_repository_exits_with_failure() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = gitai(temp.path(), &["setup"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not inside a git repository"));
}

#[test]
fn customization_llm_declares_backend() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_git_repo(temp.path());

    let output = gitai(temp.path(), &["customization", "llm", "--name", "LocalLlama"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let config = fs::read_to_string(temp.path().join(".gitai/config.toml")).expect("config");
    assert!(config.contains("[backends.local_llama]"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Added [backends.local_llama]"));
}

#[test]
fn invalid_template_group_exits_with_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_git_repo(temp.path());

    let output = gitai(
        temp.path(),
        &[
            "customization",
            "template",
            "--llm-job-name",
            "CommitTitle",
            "--template-group",
            "assistant",
        ],
    );

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid role"));
}
