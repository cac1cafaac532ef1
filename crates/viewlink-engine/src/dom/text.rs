//! Text normalization and fingerprinting used to match elements by content.

use regex::Regex;
use std::sync::OnceLock;

/// Maximum number of characters kept in an anchor's text snippet.
pub const SNIPPET_LEN: usize = 32;

fn whitespace_run() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_text(text: &str) -> String {
    whitespace_run().replace_all(text.trim(), " ").into_owned()
}

/// First [`SNIPPET_LEN`] characters of already-normalized text.
pub fn text_snippet(normalized: &str) -> String {
    normalized.chars().take(SNIPPET_LEN).collect()
}

/// Cheap rolling hash of already-normalized text.
///
/// Collisions are acceptable: the resolver only uses the hash as one signal
/// alongside position and snippet.
pub fn text_hash(normalized: &str) -> u32 {
    normalized
        .chars()
        .fold(0u32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as u32))
}
