//! Query normalization
//!
//! One normalization, applied everywhere a query is matched or keyed:
//! classification, section retrieval, article ranking, and feedback keys all
//! see the same string. The raw query is preserved separately for display.
//!
//! Rules: Unicode NFKC, lowercase, anything outside [a-z0-9] becomes a
//! space, runs of whitespace collapse to one space, ends trimmed.

use unicode_normalization::UnicodeNormalization;

/// Normalize a raw query for matching and feedback keying.
pub fn normalize(raw: &str) -> String {
    let folded: String = raw.nfkc().collect::<String>().to_lowercase();

    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for ch in folded.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Tokenize an already-normalized query.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
