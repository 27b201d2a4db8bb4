//! `gitai setup-branch`: record what the current branch is for.

use anyhow::Result;
use tracing::{info, warn};

use crate::io::branch_store::{BranchInfo, BranchStore, StoreError};
use crate::io::git::Repository;
use crate::io::operator::Operator;

/// Ask for purpose and ticket link of the current branch and store them.
///
/// Blank answers keep the recorded values. `now` (Unix seconds) is only used
/// for new records.
pub fn setup_branch(
    repo: &dyn Repository,
    store: &BranchStore,
    operator: &mut dyn Operator,
    now: i64,
) -> Result<BranchInfo> {
    let branch = repo.current_branch()?;
    let existing = match store.get(&branch) {
        Ok(info) => Some(info),
        Err(StoreError::DoesNotExist(_)) => None,
        Err(err) => return Err(err.into()),
    };

    let purpose_question = match &existing {
        Some(info) => {
            warn!(branch = %branch, "branch already has a configuration");
            format!(
                "[Optional] Enter the purpose of the branch (current purpose is {}):",
                info.purpose.as_deref().unwrap_or("not set")
            )
        }
        None => format!("[Optional] Enter the purpose of the branch (current branch is {branch}):"),
    };
    let purpose = answer_or(
        operator.ask(&purpose_question)?,
        existing.as_ref().and_then(|info| info.purpose.clone()),
    );

    let ticket_question = match &existing {
        Some(info) => format!(
            "[Optional] Enter the ticket link (current ticket link is {}):",
            info.ticket_link.as_deref().unwrap_or("not set")
        ),
        None => format!("[Optional] Enter the ticket link (current branch is {branch}):"),
    };
    let ticket_link = answer_or(
        operator.ask(&ticket_question)?,
        existing.as_ref().and_then(|info| info.ticket_link.clone()),
    );

    let info = match existing {
        Some(previous) => {
            info!(branch = %branch, "updating branch info");
            store.update(&branch, purpose.as_deref(), ticket_link.as_deref())?;
            BranchInfo {
                purpose,
                ticket_link,
                ..previous
            }
        }
        None => {
            info!(branch = %branch, "inserting branch info");
            let info = BranchInfo {
                branch_name: branch,
                purpose,
                ticket_link,
                created_at: now,
            };
            store.insert(&info)?;
            info
        }
    };
    operator.notify(&format!("Saved branch info for {}.", info.branch_name))?;
    Ok(info)
}

fn answer_or(answer: String, previous: Option<String>) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        previous
    } else {
        Some(answer.to_string())
    }
}
