//! Prompt template resolution and rendering.
//!
//! Each LLM job owns three templates, `<context>_system.txt`,
//! `<context>_user.txt` and `<context>_revision.txt`. Lookup order per role:
//! a literal template bound on the job, the job's `prompt_template_dir`
//! override, then `general.default_prompt_template_dir`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use minijinja::Environment;
use tracing::debug;

use crate::error::ConfigError;
use crate::io::config::GitaiConfig;

pub const TEMPLATE_EXTENSION: &str = "txt";

/// Key-value context passed to a template.
pub type TemplateContext = BTreeMap<String, String>;

/// Which of a job's three templates to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateRole {
    System,
    User,
    Revision,
}

impl TemplateRole {
    pub const ALL: [TemplateRole; 3] = [
        TemplateRole::System,
        TemplateRole::User,
        TemplateRole::Revision,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateRole::System => "system",
            TemplateRole::User => "user",
            TemplateRole::Revision => "revision",
        }
    }

    /// File name of this role's template for a job context.
    pub fn file_name(self, context_name: &str) -> String {
        format!("{context_name}_{}.{TEMPLATE_EXTENSION}", self.as_str())
    }
}

impl fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(TemplateRole::System),
            "user" => Ok(TemplateRole::User),
            "revision" => Ok(TemplateRole::Revision),
            other => Err(ConfigError::InvalidRole(other.to_string())),
        }
    }
}

/// Where a template comes from once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Literal(String),
    File(PathBuf),
}

impl TemplateSource {
    fn load(&self) -> Result<String> {
        match self {
            TemplateSource::Literal(text) => Ok(text.clone()),
            TemplateSource::File(path) => fs::read_to_string(path)
                .with_context(|| format!("read template {}", path.display())),
        }
    }
}

/// Resolves and renders the templates of one job.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    job_type_name: String,
    context_name: String,
    literals: BTreeMap<TemplateRole, String>,
    job_dir: Option<PathBuf>,
    default_dir: Option<PathBuf>,
}

impl TemplateResolver {
    /// Build a resolver for a job from configuration.
    ///
    /// Relative directories are resolved against `toplevel`.
    pub fn for_job(
        job_type_name: &str,
        context_name: &str,
        literals: BTreeMap<TemplateRole, String>,
        config: &GitaiConfig,
        toplevel: &Path,
    ) -> Self {
        let job_dir = config
            .job(job_type_name)
            .and_then(|job| job.prompt_template_dir.as_deref())
            .filter(|dir| !dir.trim().is_empty())
            .map(|dir| toplevel.join(dir));
        let default_dir = config
            .general
            .default_prompt_template_dir
            .as_deref()
            .map(|dir| toplevel.join(dir));
        Self {
            job_type_name: job_type_name.to_string(),
            context_name: context_name.to_string(),
            literals,
            job_dir,
            default_dir,
        }
    }

    /// Locate the template for `role` without reading it.
    pub fn resolve(&self, role: TemplateRole) -> Result<TemplateSource, ConfigError> {
        if let Some(text) = self.literals.get(&role) {
            return Ok(TemplateSource::Literal(text.clone()));
        }
        let dir = self
            .job_dir
            .as_ref()
            .or(self.default_dir.as_ref())
            .ok_or_else(|| {
                ConfigError::NoJobConfigured(format!(
                    "no prompt template directory configured for job {}",
                    self.job_type_name
                ))
            })?;
        let path = dir.join(role.file_name(&self.context_name));
        if !path.exists() {
            return Err(ConfigError::JobImproperlyConfigured(format!(
                "no {role} template for job {} (expected {})",
                self.job_type_name,
                path.display()
            )));
        }
        Ok(TemplateSource::File(path))
    }

    /// Resolve every role up front so configuration problems surface before any model call.
    pub fn check_all(&self) -> Result<(), ConfigError> {
        for role in TemplateRole::ALL {
            self.resolve(role)?;
        }
        Ok(())
    }

    /// Resolve, read and render the template for `role`.
    pub fn render(&self, role: TemplateRole, context: &TemplateContext) -> Result<String> {
        let source = self.resolve(role)?;
        let template = source.load()?;
        debug!(job = %self.job_type_name, role = %role, "rendering template");
        render_template(&template, context).with_context(|| {
            format!("render {role} template for job {}", self.job_type_name)
        })
    }
}

/// Render template text with `context`. Unknown variables render as empty text.
pub fn render_template(template: &str, context: &TemplateContext) -> Result<String> {
    let env = Environment::new();
    let rendered = env.render_str(template, context)?;
    Ok(rendered.trim().to_string())
}

/// A default template shipped with gitai.
#[derive(Debug, Clone, Copy)]
pub struct BundledTemplate {
    pub file_name: &'static str,
    pub contents: &'static str,
}

macro_rules! bundled {
    ($($name:literal),* $(,)?) => {
        &[$(BundledTemplate {
            file_name: $name,
            contents: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $name)),
        }),*]
    };
}

/// Templates written to `.gitai/templates/` by `gitai setup`.
pub const BUNDLED_TEMPLATES: &[BundledTemplate] = bundled![
    "commit_title_system.txt",
    "commit_title_user.txt",
    "commit_title_revision.txt",
    "commit_body_system.txt",
    "commit_body_user.txt",
    "commit_body_revision.txt",
    "feedback_on_commit_system.txt",
    "feedback_on_commit_user.txt",
    "feedback_on_commit_revision.txt",
    "code_review_system.txt",
    "code_review_user.txt",
    "code_review_revision.txt",
];

/// Bundled template contents for a file name, if gitai ships one.
pub fn bundled_template(file_name: &str) -> Option<&'static str> {
    BUNDLED_TEMPLATES
        .iter()
        .find(|template| template.file_name == file_name)
        .map(|template| template.contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::JobConfig;

    fn config_with_default_dir(dir: Option<&str>) -> GitaiConfig {
        let mut cfg = GitaiConfig::default();
        cfg.general.default_prompt_template_dir = dir.map(str::to_string);
        cfg
    }

    fn write_templates(dir: &Path, context: &str) {
        fs::create_dir_all(dir).expect("mkdir");
        for role in TemplateRole::ALL {
            fs::write(
                dir.join(role.file_name(context)),
                format!("{} of {context}: {{{{ value }}}}", role.as_str()),
            )
            .expect("write template");
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "assistant".parse::<TemplateRole>().expect_err("invalid");
        assert_eq!(err, ConfigError::InvalidRole("assistant".to_string()));
    }

    #[test]
    fn literal_template_bypasses_lookup() {
        let resolver = TemplateResolver::for_job(
            "CommitTitle",
            "commit_title",
            BTreeMap::from([(TemplateRole::User, "literal {{ diff }}".to_string())]),
            &config_with_default_dir(None),
            Path::new("/nonexistent"),
        );
        let context = TemplateContext::from([("diff".to_string(), "x".to_string())]);
        let rendered = resolver.render(TemplateRole::User, &context).expect("render");
        assert_eq!(rendered, "literal x");
    }

    #[test]
    fn missing_directory_is_no_job_configured() {
        let resolver = TemplateResolver::for_job(
            "CommitTitle",
            "commit_title",
            BTreeMap::new(),
            &config_with_default_dir(None),
            Path::new("/nonexistent"),
        );
        let err = resolver.resolve(TemplateRole::System).expect_err("no dir");
        assert!(matches!(err, ConfigError::NoJobConfigured(_)));
    }

    #[test]
    fn missing_file_is_improperly_configured() {
        let temp = tempfile::tempdir().expect("tempdir");
        let resolver = TemplateResolver::for_job(
            "CommitTitle",
            "commit_title",
            BTreeMap::new(),
            &config_with_default_dir(Some("templates")),
            temp.path(),
        );
        let err = resolver.resolve(TemplateRole::Revision).expect_err("no file");
        assert!(matches!(err, ConfigError::JobImproperlyConfigured(_)));
    }

    #[test]
    fn job_directory_wins_over_default_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_templates(&temp.path().join("default"), "commit_title");
        write_templates(&temp.path().join("custom"), "commit_title");
        let mut cfg = config_with_default_dir(Some("default"));
        cfg.jobs.insert(
            "CommitTitle".to_string(),
            JobConfig {
                prompt_template_dir: Some("custom".to_string()),
                ..JobConfig::default()
            },
        );

        let resolver = TemplateResolver::for_job(
            "CommitTitle",
            "commit_title",
            BTreeMap::new(),
            &cfg,
            temp.path(),
        );
        let source = resolver.resolve(TemplateRole::User).expect("resolve");
        assert_eq!(
            source,
            TemplateSource::File(temp.path().join("custom").join("commit_title_user.txt"))
        );

        let other = TemplateResolver::for_job(
            "CommitBody",
            "commit_body",
            BTreeMap::new(),
            &cfg,
            temp.path(),
        );
        assert!(matches!(
            other.resolve(TemplateRole::User),
            Err(ConfigError::JobImproperlyConfigured(_))
        ));
    }

    #[test]
    fn missing_context_keys_render_empty() {
        let rendered =
            render_template("feedback: [{{ feedback }}]", &TemplateContext::new()).expect("render");
        assert_eq!(rendered, "feedback: []");
    }

    #[test]
    fn every_job_context_has_three_bundled_templates() {
        for context in ["commit_title", "commit_body", "feedback_on_commit", "code_review"] {
            for role in TemplateRole::ALL {
                assert!(
                    bundled_template(&role.file_name(context)).is_some(),
                    "missing bundled {context} {role}"
                );
            }
        }
    }
}
