//! Cleaning of free text submitted by users before it is stored.

use regex::Regex;
use std::sync::LazyLock;

/// Anything that looks like an HTML tag or comment
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|</?[a-zA-Z][^>]*>").expect("Invalid tag regex"));

/// Strip HTML tags, drop `<`, `>`, `"` and `'`, and trim.
///
/// ```
/// use moodie::sanitize::sanitize_input;
///
/// assert_eq!(sanitize_input("  <b>Great</b> film, 10/10 "), "Great film, 10/10");
/// ```
pub fn sanitize_input(value: &str) -> String {
    let stripped = TAG_REGEX.replace_all(value, "");
    stripped
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

/// [`sanitize_input`] for optional fields; a value that is empty afterwards becomes `None`.
pub fn sanitize_optional(value: Option<&str>) -> Option<String> {
    value.map(sanitize_input).filter(|s| !s.is_empty())
}
