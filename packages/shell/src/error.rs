use thiserror::Error;

/// Errors produced while tokenizing or parsing. Offsets count characters
/// from the start of the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("unexpected {found} at offset {offset}")]
    Unexpected { found: String, offset: usize },

    #[error("bad substitution: ${{{0}}}")]
    BadSubstitution(String),

    #[error("unsupported syntax `{syntax}` at offset {offset}")]
    Unsupported { syntax: &'static str, offset: usize },
}
