use crate::ast::{AssignValue, Assignment, Word, WordPart};
use crate::error::ParseError;
use crate::mode::ParserMode;
use crate::token::Token;

/// Pull-based tokenizer.
///
/// Tokens are produced one at a time so that the caller can change the
/// [`ParserMode`] between commands; the same input may therefore be lexed
/// differently before and after a `shopt` runs.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Current character offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move back to an earlier offset so the input is lexed again.
    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos.min(self.chars.len());
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self, mode: ParserMode) -> Result<Option<Token>, ParseError> {
        loop {
            match self.peek() {
                None => return Ok(None),
                Some(' ') | Some('\t') => self.pos += 1,
                Some('\\') if self.peek_at(1) == Some('\n') => self.pos += 2,
                // Comments run to end of line; the newline itself is a token.
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(_) => break,
            }
        }

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let token = match c {
            '\n' => {
                self.pos += 1;
                Token::Newline
            }
            ';' => {
                if self.peek_at(1) == Some(';') {
                    return Err(ParseError::Unsupported {
                        syntax: ";;",
                        offset: start,
                    });
                }
                self.pos += 1;
                Token::Semi
            }
            '&' => {
                if self.peek_at(1) != Some('&') {
                    return Err(ParseError::Unsupported {
                        syntax: "&",
                        offset: start,
                    });
                }
                self.pos += 2;
                Token::And
            }
            '|' => {
                if self.peek_at(1) != Some('|') {
                    return Err(ParseError::Unsupported {
                        syntax: "|",
                        offset: start,
                    });
                }
                self.pos += 2;
                Token::Or
            }
            '(' => {
                self.pos += 1;
                Token::LParen
            }
            ')' => {
                self.pos += 1;
                Token::RParen
            }
            '<' | '>' => {
                return Err(ParseError::Unsupported {
                    syntax: "redirection",
                    offset: start,
                })
            }
            _ => self.lex_word(mode)?,
        };
        Ok(Some(token))
    }

    /// Lex a word, an assignment, or a reserved brace.
    fn lex_word(&mut self, mode: ParserMode) -> Result<Token, ParseError> {
        let start = self.pos;

        if let Some(name) = self.try_assignment_prefix() {
            if self.peek() == Some('(') {
                self.pos += 1;
                let elements = self.lex_array_elements(mode, start)?;
                return Ok(Token::Assignment(Assignment {
                    name,
                    value: AssignValue::Array(elements),
                }));
            }
            let parts = self.lex_word_parts()?;
            return Ok(Token::Assignment(Assignment {
                name,
                value: AssignValue::Scalar(Word::new(parts)),
            }));
        }

        let word = self.lex_single_word(mode)?;
        let raw: String = self.chars[start..self.pos].iter().collect();
        Ok(match raw.as_str() {
            "{" => Token::LBrace,
            "}" => Token::RBrace,
            _ => Token::Word(word),
        })
    }

    /// A word in any position: an Oil splice when enabled, otherwise the
    /// usual sequence of parts.
    fn lex_single_word(&mut self, mode: ParserMode) -> Result<Word, ParseError> {
        if mode.parse_at {
            if let Some(name) = self.try_splice_word() {
                return Ok(Word::new(vec![WordPart::ArraySub {
                    name,
                    splice: true,
                    quoted: true,
                }]));
            }
        }
        let start = self.pos;
        let parts = self.lex_word_parts()?;
        if parts.is_empty() {
            let found = self.peek().map(|c| format!("`{c}`")).unwrap_or_else(|| "end of input".into());
            return Err(ParseError::Unexpected {
                found,
                offset: start,
            });
        }
        Ok(Word::new(parts))
    }

    /// Elements of `name=( ... )`, up to and including the closing paren.
    fn lex_array_elements(
        &mut self,
        mode: ParserMode,
        start: usize,
    ) -> Result<Vec<Word>, ParseError> {
        let mut elements = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::Unterminated {
                        what: "array literal",
                        offset: start,
                    })
                }
                Some(' ') | Some('\t') | Some('\n') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(elements);
                }
                Some(_) => elements.push(self.lex_single_word(mode)?),
            }
        }
    }

    /// `@name` filling the whole word. Consumes nothing on failure.
    fn try_splice_word(&mut self) -> Option<String> {
        if self.peek() != Some('@') {
            return None;
        }
        let mut end = self.pos + 1;
        match self.chars.get(end) {
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {}
            _ => return None,
        }
        while let Some(c) = self.chars.get(end) {
            if c.is_ascii_alphanumeric() || *c == '_' {
                end += 1;
            } else {
                break;
            }
        }
        if let Some(&c) = self.chars.get(end) {
            if !is_word_terminator(c) {
                return None;
            }
        }
        let name: String = self.chars[self.pos + 1..end].iter().collect();
        self.pos = end;
        Some(name)
    }

    /// `name=` at the start of a word. Consumes nothing on failure.
    fn try_assignment_prefix(&mut self) -> Option<String> {
        let mut end = self.pos;
        match self.chars.get(end) {
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {}
            _ => return None,
        }
        while let Some(c) = self.chars.get(end) {
            if c.is_ascii_alphanumeric() || *c == '_' {
                end += 1;
            } else {
                break;
            }
        }
        if self.chars.get(end) != Some(&'=') {
            return None;
        }
        let name: String = self.chars[self.pos..end].iter().collect();
        self.pos = end + 1;
        Some(name)
    }

    /// Read the parts of one word, stopping at a word terminator.
    fn lex_word_parts(&mut self) -> Result<Vec<WordPart>, ParseError> {
        let mut parts = Vec::new();
        let mut run = String::new();
        let mut run_is_glob = false;

        while let Some(c) = self.peek() {
            if is_word_terminator(c) {
                break;
            }
            match c {
                '\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some('\n') => self.pos += 1,
                        Some(escaped) => {
                            self.pos += 1;
                            flush_run(&mut parts, &mut run, &mut run_is_glob);
                            push_literal(&mut parts, &escaped.to_string());
                        }
                        None => run.push('\\'),
                    }
                }
                '\'' => {
                    let start = self.pos;
                    self.pos += 1;
                    let content = self.read_until('\'', "single quote", start)?;
                    flush_run(&mut parts, &mut run, &mut run_is_glob);
                    push_literal(&mut parts, &content);
                }
                '"' => {
                    let start = self.pos;
                    self.pos += 1;
                    let quoted = self.lex_double_quoted(start)?;
                    flush_run(&mut parts, &mut run, &mut run_is_glob);
                    for part in quoted {
                        push_part(&mut parts, part);
                    }
                }
                '$' => match self.lex_dollar(false)? {
                    Some(part) => {
                        flush_run(&mut parts, &mut run, &mut run_is_glob);
                        parts.push(part);
                    }
                    None => run.push('$'),
                },
                '`' => {
                    return Err(ParseError::Unsupported {
                        syntax: "`",
                        offset: self.pos,
                    })
                }
                '*' | '?' | '[' => {
                    run.push(c);
                    run_is_glob = true;
                    self.pos += 1;
                }
                _ => {
                    run.push(c);
                    self.pos += 1;
                }
            }
        }
        flush_run(&mut parts, &mut run, &mut run_is_glob);
        Ok(parts)
    }

    /// The body of a double-quoted string; `start` is the opening quote.
    fn lex_double_quoted(&mut self, start: usize) -> Result<Vec<WordPart>, ParseError> {
        let mut parts = Vec::new();
        let mut literal = String::new();

        loop {
            let Some(c) = self.peek() else {
                return Err(ParseError::Unterminated {
                    what: "double quote",
                    offset: start,
                });
            };
            match c {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\\' => match self.peek_at(1) {
                    Some('\n') => self.pos += 2,
                    Some(next @ ('$' | '"' | '\\' | '`')) => {
                        literal.push(next);
                        self.pos += 2;
                    }
                    _ => {
                        literal.push('\\');
                        self.pos += 1;
                    }
                },
                '$' => match self.lex_dollar(true)? {
                    Some(part) => {
                        if !literal.is_empty() {
                            parts.push(WordPart::Literal(std::mem::take(&mut literal)));
                        }
                        parts.push(part);
                    }
                    None => literal.push('$'),
                },
                '`' => {
                    return Err(ParseError::Unsupported {
                        syntax: "`",
                        offset: self.pos,
                    })
                }
                _ => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }

        if !literal.is_empty() || parts.is_empty() {
            parts.push(WordPart::Literal(literal));
        }
        Ok(parts)
    }

    /// Lex a `$` substitution. Returns `None` (with the `$` consumed) when the
    /// dollar sign is just literal text.
    fn lex_dollar(&mut self, quoted: bool) -> Result<Option<WordPart>, ParseError> {
        let start = self.pos;
        self.pos += 1; // skip '$'
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let part = match c {
            '{' => {
                self.pos += 1;
                let content = self.read_until('}', "`${`", start)?;
                parse_braced(&content, quoted)?
            }
            '(' => {
                return Err(ParseError::Unsupported {
                    syntax: "$(",
                    offset: start,
                })
            }
            '@' | '*' => {
                self.pos += 1;
                WordPart::PositionalArgs {
                    splice: c == '@',
                    quoted,
                }
            }
            '?' | '#' | '$' | '!' | '0'..='9' => {
                self.pos += 1;
                WordPart::VarSub {
                    name: c.to_string(),
                    quoted,
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                WordPart::VarSub { name, quoted }
            }
            _ => return Ok(None),
        };
        Ok(Some(part))
    }

    /// Read up to `terminator`, consuming it.
    fn read_until(
        &mut self,
        terminator: char,
        what: &'static str,
        start: usize,
    ) -> Result<String, ParseError> {
        let mut result = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == terminator {
                return Ok(result);
            }
            result.push(c);
        }
        Err(ParseError::Unterminated {
            what,
            offset: start,
        })
    }
}

/// Characters that end an unquoted word.
fn is_word_terminator(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>'
    )
}

fn flush_run(parts: &mut Vec<WordPart>, run: &mut String, is_glob: &mut bool) {
    if run.is_empty() {
        return;
    }
    let text = std::mem::take(run);
    if *is_glob {
        parts.push(WordPart::GlobPattern(text));
    } else {
        push_literal(parts, &text);
    }
    *is_glob = false;
}

/// Append literal text, merging with a preceding literal part.
fn push_literal(parts: &mut Vec<WordPart>, text: &str) {
    if let Some(WordPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(WordPart::Literal(text.to_string()));
    }
}

fn push_part(parts: &mut Vec<WordPart>, part: WordPart) {
    match part {
        WordPart::Literal(text) => push_literal(parts, &text),
        other => parts.push(other),
    }
}

/// Interpret the inside of `${...}`.
fn parse_braced(content: &str, quoted: bool) -> Result<WordPart, ParseError> {
    match content {
        "@" | "*" => {
            return Ok(WordPart::PositionalArgs {
                splice: content == "@",
                quoted,
            })
        }
        "?" | "#" | "$" | "!" => {
            return Ok(WordPart::VarSub {
                name: content.to_string(),
                quoted,
            })
        }
        _ => {}
    }

    if !content.is_empty() && content.chars().all(|c| c.is_ascii_digit()) {
        return Ok(WordPart::VarSub {
            name: content.to_string(),
            quoted,
        });
    }

    if let Some((name, subscript)) = split_subscript(content) {
        return Ok(match subscript {
            "@" | "*" => WordPart::ArraySub {
                name: name.to_string(),
                splice: subscript == "@",
                quoted,
            },
            // Single elements are scalar lookups of `name[index]`.
            _ => WordPart::VarSub {
                name: content.to_string(),
                quoted,
            },
        });
    }

    if is_valid_var_name(content) {
        return Ok(WordPart::VarSub {
            name: content.to_string(),
            quoted,
        });
    }

    Err(ParseError::BadSubstitution(content.to_string()))
}

/// Split `name[subscript]` into its pieces.
fn split_subscript(s: &str) -> Option<(&str, &str)> {
    let open = s.find('[')?;
    let inner = s.strip_suffix(']')?;
    let name = &s[..open];
    let subscript = &inner[open + 1..];
    if !is_valid_var_name(name) || subscript.is_empty() {
        return None;
    }
    Some((name, subscript))
}

/// Check whether `name` is a valid shell variable name (starts with letter or
/// underscore, then alphanumeric or underscore).
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
