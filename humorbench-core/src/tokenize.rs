//! Word/punctuation tokenizer used by every perturbation.
//!
//! Tokens are either a maximal run of word characters (letters, digits,
//! underscore) or a single non-whitespace character. Whitespace is implicit:
//! [`detokenize`] re-inserts exactly one space between adjacent words, so the
//! token sequence survives a round trip while the original spacing does not.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|\S").unwrap());
static WORD_CHAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w$").unwrap());

/// Split `text` into word and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Rebuild a readable string from tokens.
///
/// A space is inserted before a token only when it starts with a word
/// character and the last emitted character is alphanumeric. Word characters
/// that are not alphanumeric (underscore, combining marks) also count as a
/// left neighbour, otherwise two word tokens would fuse into one.
pub fn detokenize<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for token in tokens {
        let token = token.as_ref();
        let starts_with_word = token.chars().next().is_some_and(is_word_char);
        let after_word = out
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || is_word_char(c));
        if starts_with_word && after_word {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

/// Whether a token consists solely of alphabetic characters.
///
/// Only such tokens are eligible for word-level perturbation gates.
pub fn is_alpha_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

fn is_word_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    WORD_CHAR_RE.is_match(c.encode_utf8(&mut buf))
}
