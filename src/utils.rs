//! Text normalization helpers shared by the extraction and clustering stages.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::UNKNOWN;
use crate::constants::segment::QUOTE_CHARS;

static HYPHEN_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("hyphen spacing pattern compiles"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Clean an extracted phrase: first line only, one trailing punctuation mark
/// dropped, hyphen spacing removed, whitespace collapsed.
///
/// May return an empty string; see [`clean_or_unknown`].
pub fn clean_phrase(text: &str) -> String {
    let first_line = text.split('\n').next().unwrap_or("");
    let mut trimmed = first_line.trim();
    if let Some(last) = trimmed.chars().last() {
        if matches!(last, '.' | ',' | ';' | '!' | '?' | '-') {
            trimmed = &trimmed[..trimmed.len() - last.len_utf8()];
        }
    }
    let joined = HYPHEN_SPACING.replace_all(trimmed, "-");
    normalize_inline_whitespace(joined.as_ref())
}

/// [`clean_phrase`], with empty results replaced by the `unknown` sentinel.
pub fn clean_or_unknown(text: &str) -> String {
    let cleaned = clean_phrase(text);
    if cleaned.is_empty() {
        UNKNOWN.to_string()
    } else {
        cleaned
    }
}

/// Strip surrounding whitespace and quote characters.
pub fn strip_quotes(text: &str) -> &str {
    text.trim().trim_matches(&QUOTE_CHARS[..]).trim()
}
