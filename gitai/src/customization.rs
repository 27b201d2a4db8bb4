//! `gitai customization {template|job|llm}`.
//!
//! Customizations live in the repository's local config
//! (`.gitai/config.toml`) and in `.gitai/customization/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tracing::info;

use crate::core::naming::camel_to_snake;
use crate::error::ConfigError;
use crate::io::init::{GitaiPaths, write_if_missing};
use crate::io::templates::{TemplateRole, bundled_template};
use crate::jobs::LlmJobKind;

static BACKEND_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("backend name regex"));

/// What a customization command changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomizationReport {
    pub written: Vec<PathBuf>,
    pub config_section: Option<String>,
}

/// Copy a job's default templates into `.gitai/customization/templates/` and
/// point the job at that directory.
///
/// With `role`, only that template must be new; the other roles are copied
/// when missing so the directory stays complete for the job.
pub fn customize_template(
    paths: &GitaiPaths,
    job_name: &str,
    role: Option<&str>,
) -> Result<CustomizationReport> {
    let kind = LlmJobKind::parse(job_name)?;
    let role: Option<TemplateRole> = role
        .filter(|role| !role.trim().is_empty())
        .map(|role| role.trim().parse())
        .transpose()?;
    let target_dir = paths.custom_templates_dir();

    let selected: Vec<TemplateRole> = match role {
        Some(role) => vec![role],
        None => TemplateRole::ALL.to_vec(),
    };
    for role in &selected {
        let target = target_dir.join(role.file_name(kind.context_name()));
        if target.exists() {
            bail!("file {} already exists", target.display());
        }
    }

    let mut report = CustomizationReport::default();
    for role in TemplateRole::ALL {
        let file_name = role.file_name(kind.context_name());
        let contents = default_template(paths, &file_name)?;
        if write_if_missing(&target_dir.join(&file_name), &contents)? {
            report.written.push(target_dir.join(&file_name));
        }
    }

    let section = format!("jobs.{}", kind.type_name());
    if has_section(&paths.config_path, &["jobs", kind.type_name()])? {
        info!(section = %section, "config section already present, leaving it unchanged");
    } else {
        let snippet = format!(
            "\n[{section}]\nprompt_template_dir = \"{}\"\n",
            paths.relative(&target_dir)
        );
        append_to_config(&paths.config_path, &snippet)?;
        report.config_section = Some(section);
    }
    Ok(report)
}

/// Append a commented override section for a built-in job.
pub fn customize_job(paths: &GitaiPaths, job_name: &str) -> Result<CustomizationReport> {
    let kind = LlmJobKind::parse(job_name)?;
    if has_section(&paths.config_path, &["jobs", kind.type_name()])? {
        bail!(
            "[jobs.{}] already exists in {}",
            kind.type_name(),
            paths.config_path.display()
        );
    }
    let snippet = format!(
        "\n[jobs.{name}]\n\
         # Uncomment to override [general] for {name}.\n\
         # backend = \"openai\"\n\
         # model = \"gpt-4\"\n\
         # prompt_template_dir = \"{dir}\"\n",
        name = kind.type_name(),
        dir = paths.relative(&paths.custom_templates_dir()),
    );
    append_to_config(&paths.config_path, &snippet)?;
    Ok(CustomizationReport {
        written: Vec::new(),
        config_section: Some(format!("jobs.{}", kind.type_name())),
    })
}

/// Declare an OpenAI-compatible backend named after `name` in snake_case.
pub fn customize_llm(paths: &GitaiPaths, name: &str) -> Result<CustomizationReport> {
    let backend = camel_to_snake(name.trim());
    if !BACKEND_NAME_RE.is_match(&backend) {
        return Err(ConfigError::Invalid(format!(
            "backend name `{name}` must be an identifier (letters, digits, underscores)"
        ))
        .into());
    }
    if has_section(&paths.config_path, &["backends", backend.as_str()])? {
        bail!(
            "[backends.{backend}] already exists in {}",
            paths.config_path.display()
        );
    }
    let env = format!("{}_API_KEY", backend.to_ascii_uppercase());
    let snippet = format!(
        "\n[backends.{backend}]\n\
         kind = \"openai\"\n\
         api_base = \"http://localhost:8080/v1\"\n\
         api_key_env = \"{env}\"\n\
         # token_limit = 4096\n\
         # timeout_secs = 120\n"
    );
    append_to_config(&paths.config_path, &snippet)?;
    Ok(CustomizationReport {
        written: Vec::new(),
        config_section: Some(format!("backends.{backend}")),
    })
}

/// The repository's current default template, or the bundled one.
fn default_template(paths: &GitaiPaths, file_name: &str) -> Result<String> {
    let local = paths.templates_dir.join(file_name);
    if local.is_file() {
        return fs::read_to_string(&local).with_context(|| format!("read {}", local.display()));
    }
    bundled_template(file_name)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no default template {file_name}"))
}

fn read_config_table(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn has_section(path: &Path, keys: &[&str]) -> Result<bool> {
    let table = read_config_table(path)?;
    let mut current = &table;
    for key in keys {
        match current.get(*key) {
            Some(toml::Value::Table(next)) => current = next,
            Some(_) => return Ok(true),
            None => return Ok(false),
        }
    }
    Ok(true)
}

/// Append `snippet`, refusing to leave the file unparsable.
fn append_to_config(path: &Path, snippet: &str) -> Result<()> {
    let mut contents = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    } else {
        String::new()
    };
    contents.push_str(snippet);
    toml::from_str::<toml::Table>(&contents)
        .with_context(|| format!("updated {} would not parse", path.display()))?;
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "updated config");
    Ok(())
}
