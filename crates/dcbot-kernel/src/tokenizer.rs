//! Shell-style tokenizer for command text.
//!
//! Whitespace separates tokens except inside single or double quotes, so
//! `say "hello there"` yields `["say", "hello there"]`.  Backslash escapes
//! follow POSIX shell rules via [`shell_words`].

use crate::error::ParseError;

/// Split `text` into tokens, honouring shell quoting.
///
/// Empty or all-whitespace input yields an empty vector.  An unterminated
/// quote or trailing escape fails with [`ParseError`].
pub fn tokenize(text: &str) -> Result<Vec<String>, ParseError> {
    shell_words::split(text).map_err(|error| ParseError {
        input: text.to_string(),
        reason: error.to_string(),
    })
}

/// Join tokens back into a single line, quoting where required so that
/// [`tokenize`] reproduces the same sequence.
pub fn join<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    shell_words::join(tokens)
}
