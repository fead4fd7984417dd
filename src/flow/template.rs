//! `{field}` placeholder substitution for AI message templates

use super::Profile;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// Replace every `{key}` with the profile value for `key`.
///
/// Keys never captured become the empty string. Braces that do not wrap a
/// word (`{}`, `{a b}`) are left as written.
#[must_use]
pub fn interpolate(template: &str, profile: &Profile) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            profile.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
