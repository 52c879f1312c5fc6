//! Tokenizer for space-delimited control payloads
//!
//! The console separates words with single spaces. Tokenization follows
//! `getline`-style splitting:
//!
//! - the whole message is trimmed first, so whitespace-only input yields no tokens
//! - every single space is a delimiter, so a run of `n` spaces yields `n - 1`
//!   empty tokens between its neighbours; empty tokens are preserved
//! - each token is trimmed of `" \t\n\r"`
//!
//! There is no quoting or escaping. An argument cannot contain a space.

const TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\r'];

/// Split a control message into trimmed tokens
pub fn tokenize(message: &str) -> Vec<String> {
    let message = message.trim_matches(TRIM_CHARS);
    if message.is_empty() {
        return Vec::new();
    }

    message
        .split(' ')
        .map(|token| token.trim_matches(TRIM_CHARS).to_string())
        .collect()
}
