//! Backend-neutral prompt model.
//!
//! A [`Prompt`] is the conversation transcript: an ordered list of
//! [`PromptLine`]s. Order is meaningful and is never rewritten; the only
//! mutation is appending.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of a prompt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a wire role tag. Returns `None` for tags outside the fixed vocabulary.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (role, text) entry of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLine {
    pub role: Role,
    pub text: String,
}

impl PromptLine {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Ordered, append-only sequence of prompt lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prompt {
    lines: Vec<PromptLine>,
}

impl Prompt {
    pub fn new(lines: Vec<PromptLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[PromptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&PromptLine> {
        self.lines.last()
    }

    /// Consume the prompt and return it with `line` appended.
    pub fn appended(mut self, line: PromptLine) -> Self {
        self.lines.push(line);
        self
    }
}

impl From<PromptLine> for Prompt {
    fn from(line: PromptLine) -> Self {
        Self { lines: vec![line] }
    }
}

impl From<Vec<PromptLine>> for Prompt {
    fn from(lines: Vec<PromptLine>) -> Self {
        Self { lines }
    }
}

impl FromIterator<PromptLine> for Prompt {
    fn from_iter<I: IntoIterator<Item = PromptLine>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Prompt {
    type Item = PromptLine;
    type IntoIter = std::vec::IntoIter<PromptLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

impl<'a> IntoIterator for &'a Prompt {
    type Item = &'a PromptLine;
    type IntoIter = std::slice::Iter<'a, PromptLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Approximate token count for `text` (one token per four characters).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_is_one_element_prompt() {
        let prompt = Prompt::from(PromptLine::user("hello"));
        assert_eq!(prompt.len(), 1);
        assert_eq!(prompt.lines()[0].role, Role::User);
    }

    #[test]
    fn appended_keeps_existing_order() {
        let prompt = Prompt::new(vec![PromptLine::system("s"), PromptLine::user("u")])
            .appended(PromptLine::assistant("a"));
        let roles: Vec<Role> = prompt.lines().iter().map(|line| line.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn role_tags_parse_back() {
        for role in [Role::System, Role::User, Role::Assistant] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("tool"), None);
    }

    #[test]
    fn estimate_counts_characters_not_bytes() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("äöüäöüäö"), 2);
        assert_eq!(estimate_tokens("abc"), 0);
    }
}
