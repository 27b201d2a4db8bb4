//! Typed failures that callers and tests need to tell apart.
//!
//! Everything else travels as `anyhow::Error` with context; these types are
//! attached at the source so they can be recovered with `downcast_ref`.

use thiserror::Error;

/// A job cannot determine its backend, model, or templates.
///
/// Always raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no job configured: {0}")]
    NoJobConfigured(String),

    #[error("job improperly configured: {0}")]
    JobImproperlyConfigured(String),

    #[error("invalid role `{0}` (allowed: system, user, revision)")]
    InvalidRole(String),

    #[error("unknown backend `{0}`")]
    UnknownBackend(String),

    #[error("unknown job `{0}` (known: {1})")]
    UnknownJob(String, String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of a single language model invocation.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Request-size guard tripped; no request was sent.
    #[error("token count {estimated} exceeds the limit of {limit}")]
    TokenLimitExceeded { estimated: usize, limit: usize },

    /// Backend needs a key from `env` which is not set; no request was sent.
    #[error("API key for backend `{backend}` not configured (set {env})")]
    MissingApiKey { backend: String, env: String },

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, timeout, decode).
    #[error("request to backend failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response envelope lacks the field the adapter expects.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// True for failures raised before any request was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LlmError::TokenLimitExceeded { .. } | LlmError::MissingApiKey { .. }
        )
    }

    /// True for failures reported by (or on the way to) the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, LlmError::Status { .. } | LlmError::Request(_))
    }
}
