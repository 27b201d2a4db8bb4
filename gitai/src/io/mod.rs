//! Side-effecting adapters: git, files, processes and the operator's terminal.

pub mod branch_store;
pub mod config;
pub mod git;
pub mod git_state;
pub mod hooks;
pub mod init;
pub mod operator;
pub mod process;
pub mod templates;
