//! Exit codes for gitai commands.

/// Command completed.
pub const OK: i32 = 0;
/// Any fatal error: configuration, precondition, transport, git, or operator input.
pub const FAILURE: i32 = 1;
