//! `.gitai/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use super::branch_store::BranchStore;
use super::config::DEFAULT_CONFIG_TOML;
use super::templates::BUNDLED_TEMPLATES;

/// Canonical paths within `.gitai/` for a repository root.
#[derive(Debug, Clone)]
pub struct GitaiPaths {
    pub root: PathBuf,
    pub gitai_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub templates_dir: PathBuf,
    pub customization_dir: PathBuf,
}

impl GitaiPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let gitai_dir = root.join(".gitai");
        Self {
            root: root.clone(),
            gitai_dir: gitai_dir.clone(),
            gitignore_path: gitai_dir.join(".gitignore"),
            config_path: gitai_dir.join("config.toml"),
            db_path: gitai_dir.join("gitai.sqlite3"),
            templates_dir: gitai_dir.join("templates"),
            customization_dir: gitai_dir.join("customization"),
        }
    }

    /// Where `customization template` copies templates to.
    pub fn custom_templates_dir(&self) -> PathBuf {
        self.customization_dir.join("templates")
    }

    /// `path` relative to the repository root, with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Create whatever is missing under `.gitai/`. Existing files are left alone.
pub fn init_gitai(root: &Path) -> Result<GitaiPaths> {
    let paths = GitaiPaths::new(root);
    if paths.gitai_dir.exists() && !paths.gitai_dir.is_dir() {
        return Err(anyhow!(
            "gitai setup: {} exists but is not a directory",
            paths.gitai_dir.display()
        ));
    }

    create_dir(&paths.gitai_dir)?;
    create_dir(&paths.templates_dir)?;
    write_if_missing(&paths.gitignore_path, GITAI_GITIGNORE)?;
    write_if_missing(&paths.config_path, DEFAULT_CONFIG_TOML)?;
    for template in BUNDLED_TEMPLATES {
        write_if_missing(&paths.templates_dir.join(template.file_name), template.contents)?;
    }

    let store = BranchStore::open(&paths.db_path)
        .with_context(|| format!("open {}", paths.db_path.display()))?;
    store.create_table_if_not_exists()?;

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

/// Returns whether the file was written.
pub(crate) fn write_if_missing(path: &Path, contents: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))?;
    debug!(path = %path.display(), "created");
    Ok(true)
}

const GITAI_GITIGNORE: &str = "# Created by gitai automatically.\n*\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");

        let paths = init_gitai(temp.path()).expect("init");

        assert!(paths.gitai_dir.is_dir());
        assert!(paths.templates_dir.is_dir());
        assert!(paths.db_path.is_file());
        assert_eq!(
            fs::read_to_string(&paths.gitignore_path).expect("read"),
            GITAI_GITIGNORE
        );
        let templates = fs::read_dir(&paths.templates_dir).expect("read dir").count();
        assert_eq!(templates, 12);
        let cfg = load_config(std::slice::from_ref(&paths.config_path)).expect("config");
        assert_eq!(cfg.general.default_backend.as_deref(), Some("openai"));
    }

    #[test]
    fn init_keeps_existing_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_gitai(temp.path()).expect("init");
        let custom = paths.templates_dir.join("commit_title_user.txt");
        fs::write(&custom, "custom {{ diff }}").expect("write");
        fs::write(&paths.config_path, "[general]\ndefault_model = \"mine\"\n").expect("write");

        init_gitai(temp.path()).expect("re-init");

        assert_eq!(fs::read_to_string(&custom).expect("read"), "custom {{ diff }}");
        assert!(
            fs::read_to_string(&paths.config_path)
                .expect("read")
                .contains("mine")
        );
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let paths = GitaiPaths::new("/repo");
        assert_eq!(
            paths.relative(&paths.custom_templates_dir()),
            ".gitai/customization/templates"
        );
    }
}
