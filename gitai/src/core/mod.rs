//! Deterministic building blocks shared by jobs and backends.
//!
//! Nothing in here touches the filesystem, git, or the network.

pub mod ignore;
pub mod naming;
pub mod prompt;
