//! Message template interpolation.
//!
//! Violation messages may reference declaration attributes by name, e.g.
//! "expression `{value}` didn't evaluate to true". Placeholders naming an
//! unknown attribute are left untouched.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid regex"));

/// Replaces `{name}` placeholders with the matching attribute value.
///
/// # Example
///
/// ```rust
/// use constraints_core::interpolate;
///
/// let message = interpolate("statement `{value}` failed", &[("value", "SELECT 1")]);
/// assert_eq!(message, "statement `SELECT 1` failed");
/// ```
pub fn interpolate(template: &str, attributes: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            attributes
                .iter()
                .find(|(key, _)| *key == name)
                .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
        })
        .into_owned()
}

/// Renders a list attribute the way messages show it: `[a, b]`.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    let joined = items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}
