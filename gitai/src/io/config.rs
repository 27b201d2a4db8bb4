//! gitai configuration (TOML).
//!
//! Two files are merged table by table, later wins:
//! `<toplevel>/gitai.toml` (shared) and `<toplevel>/.gitai/config.toml` (local).
//! Missing files and missing keys fall back to defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const SHARED_CONFIG_FILE: &str = "gitai.toml";
pub const TOKEN_LIMIT_ENV: &str = "OPENAI_API_TOKEN_LIMIT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GitaiConfig {
    pub general: GeneralConfig,
    pub git: GitConfig,
    pub openai: BackendConfig,
    pub hugging_face: BackendConfig,
    /// User-declared backends, registered next to the built-in ones.
    pub backends: BTreeMap<String, BackendConfig>,
    /// Per-job overrides keyed by job type name (e.g. `CommitTitle`).
    pub jobs: BTreeMap<String, JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Backend used by jobs without an explicit or per-job backend.
    pub default_backend: Option<String>,
    pub default_model: Option<String>,
    /// Template directory used by jobs without a per-job directory.
    pub default_prompt_template_dir: Option<String>,
    /// Context lines for branch diffs (`git diff -U<n>`).
    pub diff_context_lines: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_backend: Some("openai".to_string()),
            default_model: Some("gpt-3.5-turbo".to_string()),
            default_prompt_template_dir: Some(".gitai/templates".to_string()),
            diff_context_lines: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Force pre-commit hooks on/off. Unset: run them if `.git/hooks/pre-commit` exists.
    pub pre_commit: Option<bool>,
    pub pre_commit_timeout_secs: u64,
    /// Ignore file relative to the repository top-level directory.
    pub ignore_file: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            pre_commit: None,
            pre_commit_timeout_secs: 10 * 60,
            ignore_file: ".gitaiignore".to_string(),
        }
    }
}

/// Connection settings for one backend. Unset keys take the defaults of its kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: Option<BackendKind>,
    pub api_base: Option<String>,
    /// Environment variable holding the API key. Empty: no authentication.
    pub api_key_env: Option<String>,
    pub token_limit: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Chat-completions API (list of role-tagged messages).
    Openai,
    /// Text-generation API (single prompt string).
    HuggingFace,
}

impl BackendKind {
    fn default_api_base(self) -> &'static str {
        match self {
            BackendKind::Openai => "https://api.openai.com/v1",
            BackendKind::HuggingFace => "https://api-inference.huggingface.co/models",
        }
    }

    fn default_api_key_env(self) -> &'static str {
        match self {
            BackendKind::Openai => "OPENAI_KEY_SECRET",
            BackendKind::HuggingFace => "HUGGING_FACE_API_TOKEN",
        }
    }
}

/// Fully resolved backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub api_base: String,
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub token_limit: usize,
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Resolve against the defaults of `fallback_kind`, reading the key through `env`.
    pub fn settings(
        &self,
        fallback_kind: BackendKind,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> BackendSettings {
        let kind = self.kind.unwrap_or(fallback_kind);
        let api_key_env = match &self.api_key_env {
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(name.trim().to_string()),
            None => Some(kind.default_api_key_env().to_string()),
        };
        let api_key = api_key_env
            .as_deref()
            .and_then(|name| env(name))
            .filter(|key| !key.is_empty());
        BackendSettings {
            kind,
            api_base: self
                .api_base
                .clone()
                .unwrap_or_else(|| kind.default_api_base().to_string()),
            api_key_env,
            api_key,
            token_limit: self.token_limit.unwrap_or(4096),
            timeout_secs: self.timeout_secs.unwrap_or(120),
        }
    }
}

/// Per-job override section `[jobs.<JobTypeName>]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct JobConfig {
    pub backend: Option<String>,
    pub model: Option<String>,
    pub prompt_template_dir: Option<String>,
}

impl GitaiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.diff_context_lines == 0 {
            return Err(ConfigError::Invalid(
                "general.diff_context_lines must be > 0".to_string(),
            ));
        }
        if self.git.pre_commit_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "git.pre_commit_timeout_secs must be > 0".to_string(),
            ));
        }
        let sections = [("openai", &self.openai), ("hugging_face", &self.hugging_face)]
            .into_iter()
            .chain(
                self.backends
                    .iter()
                    .map(|(name, backend)| (name.as_str(), backend)),
            );
        for (name, backend) in sections {
            if backend.token_limit == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{name}.token_limit must be > 0"
                )));
            }
            if backend.timeout_secs == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{name}.timeout_secs must be > 0"
                )));
            }
        }
        Ok(())
    }

    /// Per-job section, if any.
    pub fn job(&self, type_name: &str) -> Option<&JobConfig> {
        self.jobs.get(type_name)
    }

    /// Apply environment overrides (`OPENAI_API_TOKEN_LIMIT`).
    pub fn apply_env_overrides(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = env(TOKEN_LIMIT_ENV) {
            let limit: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("parse {TOKEN_LIMIT_ENV}={raw}"))?;
            self.openai.token_limit = Some(limit);
        }
        Ok(())
    }

    /// Treat empty strings in `[general]` as unset.
    fn normalize(&mut self) {
        for value in [
            &mut self.general.default_backend,
            &mut self.general.default_model,
            &mut self.general.default_prompt_template_dir,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
    }
}

/// Config file locations for a repository.
pub fn config_paths(toplevel: &Path, local_config: &Path) -> [PathBuf; 2] {
    [toplevel.join(SHARED_CONFIG_FILE), local_config.to_path_buf()]
}

/// Load and merge the config files that exist among `paths`.
pub fn load_config(paths: &[PathBuf]) -> Result<GitaiConfig> {
    let mut merged = toml::Table::new();
    for path in paths {
        if !path.exists() {
            continue;
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let table: toml::Table =
            toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        debug!(path = %path.display(), "loaded config file");
        merge_tables(&mut merged, table);
    }
    let rendered = toml::to_string(&merged).context("serialize merged config")?;
    let mut cfg: GitaiConfig = toml::from_str(&rendered).context("parse merged config")?;
    cfg.normalize();
    cfg.validate()?;
    Ok(cfg)
}

/// Recursively merge `overlay` into `base`; nested tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Default local config written by `gitai setup`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# gitai local configuration. Values here override <repo>/gitai.toml.

[general]
default_backend = "openai"
default_model = "gpt-3.5-turbo"
default_prompt_template_dir = ".gitai/templates"
diff_context_lines = 10

[git]
# pre_commit = true
pre_commit_timeout_secs = 600
ignore_file = ".gitaiignore"

[openai]
api_base = "https://api.openai.com/v1"
api_key_env = "OPENAI_KEY_SECRET"
token_limit = 4096
timeout_secs = 120

[hugging_face]
api_base = "https://api-inference.huggingface.co/models"
api_key_env = "HUGGING_FACE_API_TOKEN"
token_limit = 4096
timeout_secs = 120
"#;
