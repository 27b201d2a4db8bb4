//! Shared behaviour of jobs that talk to a language model.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, instrument};

use super::JobContext;
use super::kind::LlmJobKind;
use crate::core::prompt::{Prompt, PromptLine};
use crate::error::ConfigError;
use crate::feedback::{FeedbackRequest, run_feedback_loop};
use crate::io::config::GitaiConfig;
use crate::io::templates::{TemplateContext, TemplateResolver, TemplateRole};
use crate::llm::{BackendRegistry, LanguageModel};

/// An LLM job: a kind plus optional explicit backend, model and templates.
///
/// Anything not set explicitly comes from `[jobs.<TypeName>]`, then `[general]`.
#[derive(Debug, Clone)]
pub struct LlmJob {
    kind: LlmJobKind,
    backend: Option<String>,
    model: Option<String>,
    literals: BTreeMap<TemplateRole, String>,
}

impl LlmJob {
    pub fn new(kind: LlmJobKind) -> Self {
        Self {
            kind,
            backend: None,
            model: None,
            literals: BTreeMap::new(),
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Bind a literal template for `role`, bypassing file lookup.
    pub fn with_template(mut self, role: TemplateRole, template: impl Into<String>) -> Self {
        self.literals.insert(role, template.into());
        self
    }

    pub fn kind(&self) -> LlmJobKind {
        self.kind
    }

    pub fn backend_name<'c>(&'c self, config: &'c GitaiConfig) -> Result<&'c str, ConfigError> {
        let type_name = self.kind.type_name();
        self.backend
            .as_deref()
            .or_else(|| config.job(type_name).and_then(|job| job.backend.as_deref()))
            .filter(|name| !name.trim().is_empty())
            .or(config.general.default_backend.as_deref())
            .ok_or_else(|| {
                ConfigError::NoJobConfigured(format!("no backend configured for job {type_name}"))
            })
    }

    pub fn resolve_backend<'r>(
        &self,
        config: &GitaiConfig,
        registry: &'r BackendRegistry,
    ) -> Result<&'r dyn LanguageModel, ConfigError> {
        registry.get(self.backend_name(config)?)
    }

    pub fn resolve_model<'c>(&'c self, config: &'c GitaiConfig) -> Result<&'c str, ConfigError> {
        let type_name = self.kind.type_name();
        self.model
            .as_deref()
            .or_else(|| config.job(type_name).and_then(|job| job.model.as_deref()))
            .filter(|model| !model.trim().is_empty())
            .or(config.general.default_model.as_deref())
            .ok_or_else(|| {
                ConfigError::JobImproperlyConfigured(format!(
                    "no model configured for job {type_name}"
                ))
            })
    }

    pub fn templates(&self, config: &GitaiConfig, root: &Path) -> TemplateResolver {
        TemplateResolver::for_job(
            self.kind.type_name(),
            self.kind.context_name(),
            self.literals.clone(),
            config,
            root,
        )
    }

    /// Build the initial prompt from `context` and run the feedback loop.
    ///
    /// Backend, model and all three templates are resolved before the first
    /// model call.
    #[instrument(skip_all, fields(job = self.kind.type_name()))]
    pub fn converse(&self, ctx: &mut JobContext<'_>, context: TemplateContext) -> Result<String> {
        let backend = self.resolve_backend(ctx.config, ctx.backends)?;
        let model_id = self.resolve_model(ctx.config)?;
        let templates = self.templates(ctx.config, ctx.root);
        templates.check_all()?;

        let system = templates.render(TemplateRole::System, &context)?;
        let user = templates.render(TemplateRole::User, &context)?;
        let initial = Prompt::new(vec![PromptLine::system(system), PromptLine::user(user)]);
        debug!(backend = backend.name(), model = model_id, "starting conversation");

        let outcome = run_feedback_loop(
            FeedbackRequest {
                model: backend,
                model_id,
                label: self.kind.context_name(),
                initial,
            },
            &mut *ctx.operator,
            |feedback| {
                let revision_context =
                    TemplateContext::from([("feedback".to_string(), feedback.to_string())]);
                let text = templates.render(TemplateRole::Revision, &revision_context)?;
                Ok(PromptLine::system(text))
            },
        )?;
        Ok(outcome.text)
    }

    /// Fill `diff` and `purpose` (plus `extra`) and converse.
    pub fn perform_base(
        &self,
        ctx: &mut JobContext<'_>,
        diff: String,
        extra: TemplateContext,
    ) -> Result<String> {
        let branch = ctx.repo.current_branch()?;
        let purpose = ctx.store.purpose_for(&branch)?;
        let mut context = TemplateContext::from([
            ("diff".to_string(), diff),
            ("purpose".to_string(), purpose),
        ]);
        context.extend(extra);
        self.converse(ctx, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::JobConfig;
    use crate::test_support::StubModel;

    #[test]
    fn backend_prefers_explicit_then_job_then_default() {
        let mut cfg = GitaiConfig::default();
        let job = LlmJob::new(LlmJobKind::CommitTitle);
        assert_eq!(job.backend_name(&cfg).expect("default"), "openai");

        cfg.jobs.insert(
            "CommitTitle".to_string(),
            JobConfig {
                backend: Some("hugging_face".to_string()),
                ..JobConfig::default()
            },
        );
        assert_eq!(job.backend_name(&cfg).expect("job"), "hugging_face");

        let explicit = job.clone().with_backend("local");
        assert_eq!(explicit.backend_name(&cfg).expect("explicit"), "local");
    }

    #[test]
    fn no_backend_anywhere_is_no_job_configured() {
        let mut cfg = GitaiConfig::default();
        cfg.general.default_backend = None;
        let err = LlmJob::new(LlmJobKind::CodeReview)
            .backend_name(&cfg)
            .expect_err("none");
        assert!(matches!(err, ConfigError::NoJobConfigured(_)));
    }

    #[test]
    fn missing_model_is_improperly_configured() {
        let mut cfg = GitaiConfig::default();
        cfg.general.default_model = None;
        let err = LlmJob::new(LlmJobKind::CommitBody)
            .resolve_model(&cfg)
            .expect_err("none");
        assert!(matches!(err, ConfigError::JobImproperlyConfigured(_)));
    }

    #[test]
    fn unregistered_backend_is_unknown() {
        let cfg = GitaiConfig::default();
        let mut registry = BackendRegistry::new();
        registry.register("hugging_face", Box::new(StubModel::new(Vec::<&str>::new())));
        let err = LlmJob::new(LlmJobKind::CommitTitle)
            .resolve_backend(&cfg, &registry)
            .err()
            .expect("unknown");
        assert_eq!(err, ConfigError::UnknownBackend("openai".to_string()));
    }
}
