//! The LLM job kinds and their declared identities.

use std::fmt;

use crate::error::ConfigError;

use super::{INCLUDE_AI_FEEDBACK, USE_COMMIT_BODY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmJobKind {
    CommitTitle,
    CommitBody,
    FeedbackOnCommit,
    CodeReview,
}

impl LlmJobKind {
    pub const ALL: [LlmJobKind; 4] = [
        LlmJobKind::CommitTitle,
        LlmJobKind::CommitBody,
        LlmJobKind::FeedbackOnCommit,
        LlmJobKind::CodeReview,
    ];

    /// Key of the `[jobs.<TypeName>]` config section.
    pub const fn type_name(self) -> &'static str {
        match self {
            LlmJobKind::CommitTitle => "CommitTitle",
            LlmJobKind::CommitBody => "CommitBody",
            LlmJobKind::FeedbackOnCommit => "FeedbackOnCommit",
            LlmJobKind::CodeReview => "CodeReview",
        }
    }

    /// Template group: the snake_case form of the type name.
    pub const fn context_name(self) -> &'static str {
        match self {
            LlmJobKind::CommitTitle => "commit_title",
            LlmJobKind::CommitBody => "commit_body",
            LlmJobKind::FeedbackOnCommit => "feedback_on_commit",
            LlmJobKind::CodeReview => "code_review",
        }
    }

    pub const fn gating_flag(self) -> Option<&'static str> {
        match self {
            LlmJobKind::CommitTitle | LlmJobKind::CodeReview => None,
            LlmJobKind::CommitBody => Some(USE_COMMIT_BODY),
            LlmJobKind::FeedbackOnCommit => Some(INCLUDE_AI_FEEDBACK),
        }
    }

    /// Accepts either the type name (`CommitTitle`) or the context name (`commit_title`).
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name() == name || kind.context_name() == name)
            .ok_or_else(|| {
                let known = Self::ALL
                    .iter()
                    .map(|kind| kind.type_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                ConfigError::UnknownJob(name.to_string(), known)
            })
    }
}

impl fmt::Display for LlmJobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::naming::camel_to_snake;

    #[test]
    fn context_name_is_snake_case_type_name() {
        for kind in LlmJobKind::ALL {
            assert_eq!(camel_to_snake(kind.type_name()), kind.context_name());
        }
    }

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!(
            LlmJobKind::parse("FeedbackOnCommit").expect("type name"),
            LlmJobKind::FeedbackOnCommit
        );
        assert_eq!(
            LlmJobKind::parse("code_review").expect("context name"),
            LlmJobKind::CodeReview
        );
    }

    #[test]
    fn parse_rejects_unknown_jobs() {
        let err = LlmJobKind::parse("Summarize").expect_err("unknown");
        assert!(matches!(err, ConfigError::UnknownJob(ref name, _) if name == "Summarize"));
        assert!(err.to_string().contains("CommitTitle"));
    }
}
