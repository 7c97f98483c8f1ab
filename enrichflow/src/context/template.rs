//! `${key}` placeholder expansion.

use super::Value;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\$\{(.+?)\}").unwrap()
});

/// Source of values for template expansion.
pub trait Lookup {
    /// Returns the value stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<&Value>;
}

impl Lookup for HashMap<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

/// Replaces every `${key}` in `template` with the string form of the value
/// found under `key`.
///
/// Absent keys expand to the empty string. Expansion is a single pass:
/// placeholders appearing inside substituted values are left untouched.
pub fn expand(template: &str, lookup: &impl Lookup) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            lookup
                .lookup(&caps[1])
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Returns the keys referenced by `template`, in order of appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}
