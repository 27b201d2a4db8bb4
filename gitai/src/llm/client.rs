//! Executing prompts against a backend.
//!
//! [`ModelClient`] checks the size guard and API key before touching the
//! network, sends exactly one request through its [`Transport`], and returns
//! the reply together with the conversation extended by that reply.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::adapter::PromptAdapter;
use crate::core::prompt::{Prompt, PromptLine};
use crate::error::LlmError;
use crate::io::config::BackendSettings;

/// Result of one model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub reply: String,
    /// The prompt that was sent followed by one assistant line holding `reply`.
    pub conversation: Prompt,
}

/// A named backend able to answer prompts.
pub trait LanguageModel {
    fn name(&self) -> &str;

    fn execute(&self, prompt: &Prompt, model: &str) -> Result<Completion, LlmError>;
}

/// A single outbound JSON POST.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub bearer: Option<String>,
    pub body: Value,
}

/// Moves one request to the backend and returns the decoded JSON reply.
pub trait Transport {
    fn post_json(&self, request: &HttpRequest) -> Result<Value, LlmError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(&self, request: &HttpRequest) -> Result<Value, LlmError> {
        (**self).post_json(request)
    }
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    #[instrument(skip_all, fields(url = %request.url))]
    fn post_json(&self, request: &HttpRequest) -> Result<Value, LlmError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let value: Value = response.json()?;
        debug!(status = status.as_u16(), "backend response received");
        Ok(value)
    }
}

/// A backend built from an adapter, a transport and its settings.
pub struct ModelClient<A, T> {
    name: String,
    adapter: A,
    transport: T,
    settings: BackendSettings,
}

impl<A, T> ModelClient<A, T> {
    pub fn new(
        name: impl Into<String>,
        adapter: A,
        transport: T,
        settings: BackendSettings,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            transport,
            settings,
        }
    }

    fn bearer(&self) -> Result<Option<String>, LlmError> {
        match (&self.settings.api_key_env, &self.settings.api_key) {
            (Some(env), None) => Err(LlmError::MissingApiKey {
                backend: self.name.clone(),
                env: env.clone(),
            }),
            (_, key) => Ok(key.clone()),
        }
    }
}

impl<A, T> LanguageModel for ModelClient<A, T>
where
    A: PromptAdapter,
    T: Transport,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(backend = %self.name, model = %model))]
    fn execute(&self, prompt: &Prompt, model: &str) -> Result<Completion, LlmError> {
        let native = self.adapter.render_prompt(prompt.lines());
        let estimated = self.adapter.estimate_tokens(&native);
        info!(estimated, limit = self.settings.token_limit, "prompt size estimate");
        if estimated > self.settings.token_limit {
            return Err(LlmError::TokenLimitExceeded {
                estimated,
                limit: self.settings.token_limit,
            });
        }
        let bearer = self.bearer()?;

        let request = HttpRequest {
            url: self.adapter.request_url(&self.settings.api_base, model),
            bearer,
            body: self.adapter.request_body(&native, model),
        };
        debug!(url = %request.url, lines = prompt.len(), "sending prompt");
        let raw = self.transport.post_json(&request)?;
        let reply = self.adapter.extract_reply(&raw, &native)?;

        let conversation = prompt.clone().appended(PromptLine::assistant(reply.clone()));
        Ok(Completion {
            reply,
            conversation,
        })
    }
}
