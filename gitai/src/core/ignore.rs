//! `.gitaiignore` pattern matching.
//!
//! Patterns use shell-glob semantics where `*` also matches `/`, so `*.lock`
//! excludes lock files at any depth.

use glob::Pattern;
use tracing::warn;

/// Parse ignore-file contents: one pattern per line, blank lines and `#` comments skipped.
pub fn parse_ignore_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// True if `file_name` matches any of `patterns`.
///
/// A pattern that is not a valid glob only matches the identical path.
pub fn file_name_matches_patterns(file_name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| match Pattern::new(pattern) {
        Ok(glob) => glob.matches(file_name),
        Err(err) => {
            warn!(pattern = %pattern, err = %err, "invalid ignore pattern, comparing literally");
            pattern == file_name
        }
    })
}

/// Keep the non-empty paths that match none of `patterns`, preserving order.
pub fn filter_ignored(files: Vec<String>, patterns: &[String]) -> Vec<String> {
    files
        .into_iter()
        .filter(|file| !file.is_empty() && !file_name_matches_patterns(file, patterns))
        .collect()
}
