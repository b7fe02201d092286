use crate::ast::{Assignment, Word};

/// A token produced by the shell lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word (command name, argument, glob pattern, splice, ...)
    Word(Word),
    /// An assignment: name=value or name=(values)
    Assignment(Assignment),
    /// And: &&
    And,
    /// Or: ||
    Or,
    /// Semicolon: ;
    Semi,
    /// Newline
    Newline,
    /// Left paren: (
    LParen,
    /// Right paren: )
    RParen,
    /// Reserved word `{`
    LBrace,
    /// Reserved word `}`
    RBrace,
}

impl Token {
    /// Separators between top-level commands.
    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Semi | Token::Newline)
    }

    /// Short human-readable form used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Word(_) => "word".into(),
            Token::Assignment(a) => format!("assignment to `{}`", a.name),
            Token::And => "`&&`".into(),
            Token::Or => "`||`".into(),
            Token::Semi => "`;`".into(),
            Token::Newline => "newline".into(),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
            Token::LBrace => "`{`".into(),
            Token::RBrace => "`}`".into(),
        }
    }
}
