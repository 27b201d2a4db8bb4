//! Human-approved model conversations.
//!
//! The loop alternates between asking the model and asking the operator:
//!
//! ```text
//! AwaitingModel(prompt) --execute--> AwaitingHuman(completion)
//! AwaitingHuman --y--> done
//! AwaitingHuman --n + feedback--> AwaitingModel(conversation + revision line)
//! ```
//!
//! Every re-entry sends exactly the previous conversation plus one line, so a
//! rejected round grows the conversation by the assistant reply and the
//! revision instruction. There is no round cap; only an explicit `y` ends it.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::prompt::{Prompt, PromptLine};
use crate::io::operator::Operator;
use crate::llm::{Completion, LanguageModel};

pub const AGREE_QUESTION: &str = "Do you agree with the prompt output? [y/n]";
pub const RECOMMENDATION_QUESTION: &str = "Any recommendation for a better output?";
/// Stands in for an empty recommendation.
pub const NO_FEEDBACK: &str = "No further info provided";

/// The operator's answer to one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    /// Rejected, with a free-text recommendation (possibly empty).
    Revise(String),
}

/// Ask until the operator answers `y` or `n`.
pub fn ask_for_verdict(operator: &mut dyn Operator) -> Result<Verdict> {
    loop {
        let answer = operator.ask(AGREE_QUESTION)?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" => return Ok(Verdict::Approve),
            "n" => {
                let recommendation = operator.ask(RECOMMENDATION_QUESTION)?;
                return Ok(Verdict::Revise(recommendation.trim().to_string()));
            }
            _ => {
                warn!(answer = %answer, "unexpected answer, asking again");
                operator.notify("Please only enter 'y' or 'n'.")?;
            }
        }
    }
}

/// Inputs of one feedback loop.
pub struct FeedbackRequest<'a> {
    pub model: &'a dyn LanguageModel,
    pub model_id: &'a str,
    /// Shown next to each reply, e.g. `commit_title`.
    pub label: &'a str,
    pub initial: Prompt,
}

/// The approved reply and the conversation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackOutcome {
    pub text: String,
    pub conversation: Prompt,
    pub rounds: usize,
}

enum LoopState {
    AwaitingModel(Prompt),
    AwaitingHuman(Completion),
}

/// Run the model/operator loop until approval.
///
/// `revision_line` turns the operator's recommendation into the line appended
/// after a rejected reply.
pub fn run_feedback_loop<F>(
    request: FeedbackRequest<'_>,
    operator: &mut dyn Operator,
    mut revision_line: F,
) -> Result<FeedbackOutcome>
where
    F: FnMut(&str) -> Result<PromptLine>,
{
    let FeedbackRequest {
        model,
        model_id,
        label,
        initial,
    } = request;
    let mut rounds = 0usize;
    let mut state = LoopState::AwaitingModel(initial);
    loop {
        state = match state {
            LoopState::AwaitingModel(prompt) => {
                rounds += 1;
                info!(
                    label,
                    round = rounds,
                    lines = prompt.len(),
                    backend = model.name(),
                    "requesting reply"
                );
                let completion = model
                    .execute(&prompt, model_id)
                    .with_context(|| format!("{label}: model request (round {rounds})"))?;
                operator.present(label, &completion.reply)?;
                LoopState::AwaitingHuman(completion)
            }
            LoopState::AwaitingHuman(completion) => match ask_for_verdict(operator)? {
                Verdict::Approve => {
                    info!(label, rounds, "reply approved");
                    return Ok(FeedbackOutcome {
                        text: completion.reply,
                        conversation: completion.conversation,
                        rounds,
                    });
                }
                Verdict::Revise(feedback) => {
                    let feedback = if feedback.is_empty() {
                        NO_FEEDBACK.to_string()
                    } else {
                        feedback
                    };
                    let line = revision_line(&feedback)?;
                    LoopState::AwaitingModel(completion.conversation.appended(line))
                }
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::Role;
    use crate::error::LlmError;
    use crate::test_support::{ScriptedOperator, StubModel};

    fn initial() -> Prompt {
        Prompt::new(vec![PromptLine::system("sys"), PromptLine::user("diff")])
    }

    fn revise(feedback: &str) -> Result<PromptLine> {
        Ok(PromptLine::system(format!("revise: {feedback}")))
    }

    #[test]
    fn two_rejections_then_approval() {
        let model = StubModel::new(vec!["first", "second", "third"]);
        let mut operator = ScriptedOperator::new(["n", "shorter", "N ", "", " y "]);

        let outcome = run_feedback_loop(
            FeedbackRequest {
                model: &model,
                model_id: "gpt",
                label: "commit_title",
                initial: initial(),
            },
            &mut operator,
            revise,
        )
        .expect("loop");

        assert_eq!(outcome.text, "third");
        assert_eq!(outcome.rounds, 3);
        let sent: Vec<usize> = model.prompts().iter().map(Prompt::len).collect();
        assert_eq!(sent, vec![2, 4, 6]);
        assert_eq!(outcome.conversation.len(), 7);

        let prompts = model.prompts();
        assert_eq!(
            prompts[1].lines()[2..],
            [PromptLine::assistant("first"), PromptLine::system("revise: shorter")]
        );
        assert_eq!(
            prompts[2].last(),
            Some(&PromptLine::system(format!("revise: {NO_FEEDBACK}")))
        );
        assert_eq!(&prompts[2].lines()[..4], prompts[1].lines());
        assert_eq!(operator.presented().len(), 3);
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let model = StubModel::new(vec!["only"]);
        let mut operator = ScriptedOperator::new(["maybe", "yes", "Y"]);

        let outcome = run_feedback_loop(
            FeedbackRequest {
                model: &model,
                model_id: "gpt",
                label: "commit_body",
                initial: initial(),
            },
            &mut operator,
            revise,
        )
        .expect("loop");

        assert_eq!(outcome.text, "only");
        assert_eq!(model.calls(), 1);
        assert_eq!(operator.notices().len(), 2);
    }

    #[test]
    fn closed_input_fails_the_loop() {
        let model = StubModel::new(vec!["reply"]);
        let mut operator = ScriptedOperator::new(Vec::<&str>::new());

        let err = run_feedback_loop(
            FeedbackRequest {
                model: &model,
                model_id: "gpt",
                label: "code_review",
                initial: initial(),
            },
            &mut operator,
            revise,
        )
        .expect_err("eof");

        assert!(format!("{err:#}").contains("input closed"));
    }

    #[test]
    fn model_errors_keep_their_type() {
        let model = StubModel::new(Vec::<&str>::new());
        let mut operator = ScriptedOperator::new(["y"]);

        let err = run_feedback_loop(
            FeedbackRequest {
                model: &model,
                model_id: "gpt",
                label: "commit_title",
                initial: initial(),
            },
            &mut operator,
            revise,
        )
        .expect_err("no reply");

        assert!(err.downcast_ref::<LlmError>().is_some());
        assert!(operator.presented().is_empty());
    }

    #[test]
    fn revision_lines_use_requested_role() {
        let model = StubModel::new(vec!["a", "b"]);
        let mut operator = ScriptedOperator::new(["n", "more detail", "y"]);

        let outcome = run_feedback_loop(
            FeedbackRequest {
                model: &model,
                model_id: "gpt",
                label: "commit_title",
                initial: initial(),
            },
            &mut operator,
            revise,
        )
        .expect("loop");

        let roles: Vec<Role> = outcome.conversation.lines().iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::System, Role::Assistant]
        );
    }
}
