//! gitai: commit messages and code reviews written by a language model,
//! approved by a human.
//!
//! - **[`core`]**: Pure logic (prompts, ignore patterns, naming). No I/O.
//! - **[`io`]**: git, config, templates, the branch store and the terminal.
//!   Each side effect sits behind a trait or a path so tests can swap it.
//! - **[`llm`]**: backends that turn a [`core::prompt::Prompt`] into a reply.
//! - **[`jobs`]**: units of work, composed by [`pipeline`] into the
//!   `commit` and `pr-review` commands.
//!
//! Every model reply goes through the [`feedback`] loop before it is used.

pub mod core;
pub mod customization;
pub mod error;
pub mod exit_codes;
pub mod feedback;
pub mod io;
pub mod jobs;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod setup_branch;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;
