//! Shell-style variable expansion for variable values
//!
//! Double-quoted and `"""` values expand `$NAME` and `${NAME}` when they are
//! evaluated. Unknown names expand to the empty string, as a shell would.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z0-9_]+)\}|([A-Za-z0-9_]+))").expect("constant regex pattern is valid")
});

/// Expand `$NAME` / `${NAME}` using `lookup`; misses become empty.
///
/// A `$` not followed by a name (or by a well-formed `${NAME}`) is kept.
pub fn expand_variables(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    VAR_PATTERN
        .replace_all(s, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}
