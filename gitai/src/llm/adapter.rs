//! Conversion between [`PromptLine`]s and backend wire shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::core::prompt::{PromptLine, Role, estimate_tokens};
use crate::error::LlmError;

/// Wire-shape conversion for one family of backends.
pub trait PromptAdapter {
    /// The prompt as the backend expects it.
    type Native;

    fn render_prompt(&self, lines: &[PromptLine]) -> Self::Native;

    /// Approximate request size of a rendered prompt.
    fn estimate_tokens(&self, native: &Self::Native) -> usize;

    fn request_url(&self, api_base: &str, model: &str) -> String;

    fn request_body(&self, native: &Self::Native, model: &str) -> Value;

    /// Pull the reply text out of a raw response.
    fn extract_reply(&self, raw: &Value, prompt: &Self::Native) -> Result<String, LlmError>;
}

/// One message of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// OpenAI-style chat completions: a list of `{role, content}` messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatAdapter;

impl ChatAdapter {
    /// Inverse of [`PromptAdapter::render_prompt`].
    pub fn parse_prompt(messages: &[ChatMessage]) -> Vec<PromptLine> {
        messages
            .iter()
            .map(|message| PromptLine::new(message.role, message.content.clone()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

impl PromptAdapter for ChatAdapter {
    type Native = Vec<ChatMessage>;

    fn render_prompt(&self, lines: &[PromptLine]) -> Self::Native {
        lines
            .iter()
            .map(|line| ChatMessage {
                role: line.role,
                content: line.text.clone(),
            })
            .collect()
    }

    fn estimate_tokens(&self, native: &Self::Native) -> usize {
        let text = native
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        estimate_tokens(&text)
    }

    fn request_url(&self, api_base: &str, _model: &str) -> String {
        format!("{}/chat/completions", api_base.trim_end_matches('/'))
    }

    fn request_body(&self, native: &Self::Native, model: &str) -> Value {
        json!({
            "model": model,
            "messages": native,
        })
    }

    fn extract_reply(&self, raw: &Value, _prompt: &Self::Native) -> Result<String, LlmError> {
        let response: ChatResponse = serde_json::from_value(raw.clone())
            .map_err(|err| LlmError::MalformedResponse(format!("chat response: {err}")))?;
        if let Some(usage) = &response.usage {
            info!(
                prompt_tokens = ?usage.prompt_tokens,
                total_tokens = ?usage.total_tokens,
                "backend token usage"
            );
        }
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                LlmError::MalformedResponse("missing choices[0].message.content".to_string())
            })
    }
}

/// Hugging Face inference style: a single text prompt, replies as `generated_text` items.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAdapter;

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl PromptAdapter for TextAdapter {
    type Native = String;

    fn render_prompt(&self, lines: &[PromptLine]) -> Self::Native {
        lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn estimate_tokens(&self, native: &Self::Native) -> usize {
        estimate_tokens(native)
    }

    fn request_url(&self, api_base: &str, model: &str) -> String {
        format!("{}/{model}", api_base.trim_end_matches('/'))
    }

    fn request_body(&self, native: &Self::Native, _model: &str) -> Value {
        json!({ "inputs": native })
    }

    fn extract_reply(&self, raw: &Value, _prompt: &Self::Native) -> Result<String, LlmError> {
        let items: Vec<GeneratedText> = serde_json::from_value(raw.clone()).map_err(|err| {
            LlmError::MalformedResponse(format!("text generation response: {err}"))
        })?;
        if items.is_empty() {
            return Err(LlmError::MalformedResponse(
                "empty generated_text list".to_string(),
            ));
        }
        Ok(items
            .into_iter()
            .map(|item| item.generated_text)
            .collect::<Vec<_>>()
            .join(" "))
    }
}
