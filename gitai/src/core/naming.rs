//! Name transforms for job identifiers.

use std::sync::LazyLock;

use regex::Regex;

static WORD_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("word boundary regex"));
static LOWER_UPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("lower/upper regex"));

/// Convert a PascalCase (or camelCase) identifier to snake_case.
///
/// Runs of capitals are kept together (`ABCOther` -> `abc_other`) and input
/// that is already snake_case is returned unchanged.
pub fn camel_to_snake(name: &str) -> String {
    let split_words = WORD_BOUNDARY_RE.replace_all(name, "${1}_${2}");
    LOWER_UPPER_RE
        .replace_all(&split_words, "${1}_${2}")
        .to_lowercase()
}
