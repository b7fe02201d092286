use crate::ast::{Assignment, Command, ListOp, Word};
use crate::error::ParseError;
use crate::lexer::{is_valid_var_name, Lexer};
use crate::mode::ParserMode;
use crate::token::Token;

/// Parse a whole program under a fixed mode.
pub fn parse(input: &str, mode: ParserMode) -> Result<Vec<Command>, ParseError> {
    let mut parser = Parser::new(input, mode);
    let mut commands = Vec::new();
    while let Some(cmd) = parser.next_command()? {
        commands.push(cmd);
    }
    Ok(commands)
}

/// Incremental parser: yields one top-level and-or list per call so the
/// caller can execute it and adjust the [`ParserMode`] before the next one.
pub struct Parser {
    lexer: Lexer,
    mode: ParserMode,
    /// Lookahead token and the offset it was lexed from.
    peeked: Option<(Token, usize)>,
}

impl Parser {
    pub fn new(input: &str, mode: ParserMode) -> Self {
        Parser {
            lexer: Lexer::new(input),
            mode,
            peeked: None,
        }
    }

    /// Switch grammar mode. A lookahead token lexed under the old mode is
    /// discarded and lexed again.
    pub fn set_mode(&mut self, mode: ParserMode) {
        if mode != self.mode {
            if let Some((_, start)) = self.peeked.take() {
                self.lexer.rewind(start);
            }
        }
        self.mode = mode;
    }

    fn peek(&mut self) -> Result<Option<&Token>, ParseError> {
        if self.peeked.is_none() {
            let start = self.lexer.position();
            if let Some(token) = self.lexer.next_token(self.mode)? {
                self.peeked = Some((token, start));
            }
        }
        Ok(self.peeked.as_ref().map(|(token, _)| token))
    }

    fn advance(&mut self) -> Result<Option<Token>, ParseError> {
        self.peek()?;
        Ok(self.peeked.take().map(|(token, _)| token))
    }

    /// Offset of the lookahead token, or the lexer position at end of input.
    fn offset(&self) -> usize {
        self.peeked
            .as_ref()
            .map(|(_, start)| *start)
            .unwrap_or_else(|| self.lexer.position())
    }

    fn unexpected(&mut self) -> ParseError {
        let found = match self.peek() {
            Ok(Some(token)) => token.describe(),
            Ok(None) => "end of input".to_string(),
            Err(e) => return e,
        };
        ParseError::Unexpected {
            found,
            offset: self.offset(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        match self.peek()? {
            Some(token) if token == expected => {
                self.advance()?;
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn skip_separators(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.peek()? {
            if !token.is_separator() {
                break;
            }
            self.advance()?;
        }
        Ok(())
    }

    fn skip_newlines(&mut self) -> Result<(), ParseError> {
        while let Some(Token::Newline) = self.peek()? {
            self.advance()?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Grammar rules
    // ----------------------------------------------------------------

    /// Parse the next top-level and-or list, consuming one trailing
    /// separator. Returns `None` at end of input.
    pub fn next_command(&mut self) -> Result<Option<Command>, ParseError> {
        self.skip_separators()?;
        if self.peek()?.is_none() {
            return Ok(None);
        }
        let cmd = self.parse_and_or()?;
        match self.peek()? {
            None => {}
            Some(token) if token.is_separator() => {
                // Consume only the separator; whatever follows is lexed
                // under the mode in effect at the next call.
                self.advance()?;
            }
            Some(_) => return Err(self.unexpected()),
        }
        Ok(Some(cmd))
    }

    /// and_or = command ((AND | OR) NEWLINE* command)*
    fn parse_and_or(&mut self) -> Result<Command, ParseError> {
        let mut left = self.parse_command()?;
        loop {
            let op = match self.peek()? {
                Some(Token::And) => ListOp::And,
                Some(Token::Or) => ListOp::Or,
                _ => break,
            };
            self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_command()?;
            left = Command::List {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// command = group | function_def | simple_command
    fn parse_command(&mut self) -> Result<Command, ParseError> {
        match self.peek()? {
            Some(Token::LBrace) => self.parse_group(),
            Some(Token::Word(_)) | Some(Token::Assignment(_)) => self.parse_simple(),
            _ => Err(self.unexpected()),
        }
    }

    /// group = LBRACE (and_or SEPARATOR)* RBRACE
    fn parse_group(&mut self) -> Result<Command, ParseError> {
        let start = self.offset();
        self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        loop {
            self.skip_separators()?;
            match self.peek()? {
                None => {
                    return Err(ParseError::Unterminated {
                        what: "brace group",
                        offset: start,
                    })
                }
                Some(Token::RBrace) => {
                    self.advance()?;
                    return Ok(Command::Group { body });
                }
                Some(_) => {}
            }
            body.push(self.parse_and_or()?);
            match self.peek()? {
                Some(Token::RBrace) => {}
                Some(token) if token.is_separator() => {}
                None => {
                    return Err(ParseError::Unterminated {
                        what: "brace group",
                        offset: start,
                    })
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    /// simple_command = ASSIGNMENT* WORD (WORD | ASSIGNMENT)*
    /// function_def   = NAME LPAREN RPAREN NEWLINE* group
    fn parse_simple(&mut self) -> Result<Command, ParseError> {
        let mut assignments: Vec<Assignment> = Vec::new();
        let mut words: Vec<Word> = Vec::new();

        loop {
            match self.peek()? {
                Some(Token::Assignment(_)) => {
                    let offset = self.offset();
                    let Some(Token::Assignment(assignment)) = self.advance()? else {
                        unreachable!("peeked an assignment");
                    };
                    if words.is_empty() {
                        assignments.push(assignment);
                    } else {
                        let word = assignment.into_word().ok_or(ParseError::Unexpected {
                            found: "array assignment in argument position".into(),
                            offset,
                        })?;
                        words.push(word);
                    }
                }
                Some(Token::Word(_)) => {
                    let Some(Token::Word(word)) = self.advance()? else {
                        unreachable!("peeked a word");
                    };
                    if words.is_empty() && assignments.is_empty() {
                        if let Some(Token::LParen) = self.peek()? {
                            return self.parse_function_def(word);
                        }
                    }
                    words.push(word);
                }
                // Braces are ordinary words after the command name.
                Some(Token::LBrace) if !words.is_empty() => {
                    self.advance()?;
                    words.push(Word::literal("{"));
                }
                Some(Token::RBrace) if !words.is_empty() => {
                    self.advance()?;
                    words.push(Word::literal("}"));
                }
                _ => break,
            }
        }

        Ok(Command::Simple { assignments, words })
    }

    fn parse_function_def(&mut self, name_word: Word) -> Result<Command, ParseError> {
        let name = match name_word.as_literal() {
            Some(name) if is_valid_var_name(name) => name.to_string(),
            _ => return Err(self.unexpected()),
        };
        self.expect(&Token::LParen)?;
        self.expect(&Token::RParen)?;
        self.skip_newlines()?;
        let body = self.parse_group()?;
        Ok(Command::FunctionDef {
            name,
            body: Box::new(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AssignValue, WordPart};

    fn parse_default(input: &str) -> Vec<Command> {
        parse(input, ParserMode::default()).unwrap()
    }

    fn simple_words(cmd: &Command) -> &[Word] {
        match cmd {
            Command::Simple { words, .. } => words,
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn parses_simple_command() {
        let cmds = parse_default("echo hello world");
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            simple_words(&cmds[0]),
            &[
                Word::literal("echo"),
                Word::literal("hello"),
                Word::literal("world")
            ]
        );
    }

    #[test]
    fn separators_split_top_level_commands() {
        let cmds = parse_default("a; b\n\nc;");
        assert_eq!(cmds.len(), 3);
    }

    #[test]
    fn and_or_lists() {
        let cmds = parse_default("a && b || c");
        assert_eq!(cmds.len(), 1);
        let Command::List { left, op, .. } = &cmds[0] else {
            panic!("expected list");
        };
        assert_eq!(*op, ListOp::Or);
        assert!(matches!(**left, Command::List { op: ListOp::And, .. }));
    }

    #[test]
    fn leading_assignments_and_argument_assignments() {
        let cmds = parse_default("x=1 echo y=2");
        let Command::Simple { assignments, words } = &cmds[0] else {
            panic!("expected simple command");
        };
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].name, "x");
        assert_eq!(words[1], Word::literal("y=2"));
    }

    #[test]
    fn assignment_only_command() {
        let cmds = parse_default("words=(a 'b c')");
        let Command::Simple { assignments, words } = &cmds[0] else {
            panic!("expected simple command");
        };
        assert!(words.is_empty());
        assert!(matches!(&assignments[0].value, AssignValue::Array(v) if v.len() == 2));
    }

    #[test]
    fn array_assignment_as_argument_is_an_error() {
        let err = parse("echo a=(b)", ParserMode::default()).unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { .. }));
    }

    #[test]
    fn function_definition() {
        let cmds = parse_default("f() {\n  echo a\n  echo b; }\nf");
        assert_eq!(cmds.len(), 2);
        let Command::FunctionDef { name, body } = &cmds[0] else {
            panic!("expected function");
        };
        assert_eq!(name, "f");
        let Command::Group { body } = body.as_ref() else {
            panic!("expected group body");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn closing_brace_as_argument() {
        let cmds = parse_default("echo }");
        assert_eq!(simple_words(&cmds[0])[1], Word::literal("}"));
    }

    #[test]
    fn unterminated_group() {
        let err = parse("{ echo a;", ParserMode::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::Unterminated {
                what: "brace group",
                offset: 0
            }
        );
    }

    #[test]
    fn stray_paren_is_unexpected() {
        let err = parse("echo a )", ParserMode::default()).unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { .. }));
    }

    #[test]
    fn mode_change_between_commands_applies_to_later_words() {
        let mut parser = Parser::new("echo @a\necho @a", ParserMode::default());
        let first = parser.next_command().unwrap().unwrap();
        assert_eq!(simple_words(&first)[1], Word::literal("@a"));

        parser.set_mode(ParserMode::with_parse_at(true));
        let second = parser.next_command().unwrap().unwrap();
        assert_eq!(
            simple_words(&second)[1].parts,
            vec![WordPart::ArraySub {
                name: "a".into(),
                splice: true,
                quoted: true
            }]
        );
        assert!(parser.next_command().unwrap().is_none());
    }

    #[test]
    fn set_mode_relexes_lookahead() {
        let mut parser = Parser::new("@a", ParserMode::default());
        assert!(matches!(parser.peek(), Ok(Some(Token::Word(_)))));
        parser.set_mode(ParserMode::with_parse_at(true));
        let cmd = parser.next_command().unwrap().unwrap();
        assert!(simple_words(&cmd)[0].parts[0].is_splice());
    }
}
