//! `{name}` / `${name}` placeholder scanning and substitution.
use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A brace-delimited run of non-whitespace, non-brace characters, with an
/// optional leading `$`.
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\{([^\s{}]+)\}").expect("valid placeholder regex"));

/// Distinct placeholder names found in `text`.
pub fn tokens(text: &str) -> BTreeSet<String> {
    TOKEN
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replaces every placeholder (including any leading `$`) with its value.
/// Placeholders without a value are left as they are.
pub fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures| match values.get(&caps[1]) {
            Some(v) => v.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
