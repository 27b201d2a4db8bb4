//! Backend dispatch by name.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use super::adapter::{ChatAdapter, TextAdapter};
use super::client::{HttpTransport, LanguageModel, ModelClient};
use crate::error::ConfigError;
use crate::io::config::{BackendKind, BackendSettings, GitaiConfig};

pub const OPENAI: &str = "openai";
pub const HUGGING_FACE: &str = "hugging_face";

/// Explicit identifier → backend table, populated once at start-up.
#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn LanguageModel>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in `openai` and `hugging_face` backends plus every `[backends.<name>]` section.
    pub fn from_config(
        config: &GitaiConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            OPENAI,
            http_backend(OPENAI, config.openai.settings(BackendKind::Openai, env))?,
        );
        registry.register(
            HUGGING_FACE,
            http_backend(
                HUGGING_FACE,
                config.hugging_face.settings(BackendKind::HuggingFace, env),
            )?,
        );
        for (name, section) in &config.backends {
            let settings = section.settings(BackendKind::Openai, env);
            registry.register(name.clone(), http_backend(name, settings)?);
        }
        Ok(registry)
    }

    /// Add or replace a backend.
    pub fn register(&mut self, name: impl Into<String>, backend: Box<dyn LanguageModel>) {
        let name = name.into();
        if self.backends.insert(name.clone(), backend).is_some() {
            debug!(backend = %name, "replaced registered backend");
        }
    }

    pub fn get(&self, name: &str) -> Result<&dyn LanguageModel, ConfigError> {
        self.backends
            .get(name)
            .map(|backend| backend.as_ref())
            .ok_or_else(|| ConfigError::UnknownBackend(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

fn http_backend(name: &str, settings: BackendSettings) -> Result<Box<dyn LanguageModel>> {
    let transport = HttpTransport::new(Duration::from_secs(settings.timeout_secs))
        .with_context(|| format!("build HTTP client for backend {name}"))?;
    debug!(
        backend = name,
        kind = ?settings.kind,
        api_base = %settings.api_base,
        "registering backend"
    );
    Ok(match settings.kind {
        BackendKind::Openai => Box::new(ModelClient::new(name, ChatAdapter, transport, settings)),
        BackendKind::HuggingFace => {
            Box::new(ModelClient::new(name, TextAdapter, transport, settings))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::BackendConfig;
    use crate::test_support::StubModel;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn builtins_and_user_backends_are_registered() {
        let mut cfg = GitaiConfig::default();
        cfg.backends.insert(
            "local".to_string(),
            BackendConfig {
                api_base: Some("http://localhost:8080/v1".to_string()),
                api_key_env: Some(String::new()),
                ..BackendConfig::default()
            },
        );

        let registry = BackendRegistry::from_config(&cfg, &no_env).expect("registry");

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["hugging_face", "local", "openai"]);
        assert_eq!(registry.get("local").expect("local").name(), "local");
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let registry = BackendRegistry::new();
        let err = registry.get("anthropic").err().expect("unknown");
        assert_eq!(err, ConfigError::UnknownBackend("anthropic".to_string()));
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut registry = BackendRegistry::new();
        registry.register(OPENAI, Box::new(StubModel::named("first", Vec::<&str>::new())));
        registry.register(OPENAI, Box::new(StubModel::named("second", Vec::<&str>::new())));
        assert_eq!(registry.get(OPENAI).expect("openai").name(), "second");
    }
}
