use serde::Serialize;

/// One piece of a shell word, as produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WordPart {
    /// Text with no active glob metacharacter (quoted text lands here too).
    Literal(String),
    /// Scalar variable reference: `$name`, `${name}`, `"$name"`.
    VarSub { name: String, quoted: bool },
    /// Whole-array reference: `${a[@]}`, `"${a[@]}"`, `@a` (splice) or
    /// `${a[*]}` (joined into one value).
    ArraySub {
        name: String,
        splice: bool,
        quoted: bool,
    },
    /// An unquoted run of text containing `*`, `?` or `[`.
    GlobPattern(String),
    /// `$@` (splice) or `$*` (joined).
    PositionalArgs { splice: bool, quoted: bool },
}

impl WordPart {
    /// True for parts that expand to one field per element.
    pub fn is_splice(&self) -> bool {
        matches!(
            self,
            WordPart::ArraySub { splice: true, .. } | WordPart::PositionalArgs { splice: true, .. }
        )
    }
}

/// A shell word composed of zero or more parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn new(parts: Vec<WordPart>) -> Self {
        Word { parts }
    }

    pub fn literal(s: &str) -> Self {
        Word {
            parts: vec![WordPart::Literal(s.to_string())],
        }
    }

    /// Returns the text of a word made of a single literal part.
    pub fn as_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [WordPart::Literal(s)] => Some(s),
            _ => None,
        }
    }
}

/// The right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssignValue {
    Scalar(Word),
    Array(Vec<Word>),
}

/// A variable assignment preceding a command (e.g. `FOO=bar cmd`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub name: String,
    pub value: AssignValue,
}

impl Assignment {
    /// Re-read a scalar assignment in argument position (`echo a=b`) as an
    /// ordinary word. Array assignments have no word form.
    pub fn into_word(self) -> Option<Word> {
        match self.value {
            AssignValue::Scalar(value) => {
                let mut prefix = format!("{}=", self.name);
                let mut rest = value.parts.into_iter().peekable();
                if let Some(WordPart::Literal(text)) = rest.peek() {
                    prefix.push_str(text);
                    rest.next();
                }
                let mut parts = vec![WordPart::Literal(prefix)];
                parts.extend(rest);
                Some(Word::new(parts))
            }
            AssignValue::Array(_) => None,
        }
    }
}

/// The operator joining two commands in an and-or list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListOp {
    And, // &&
    Or,  // ||
}

/// A shell command AST node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
    /// A simple command: optional assignments followed by words.
    Simple {
        assignments: Vec<Assignment>,
        words: Vec<Word>,
    },
    /// An and-or list: cmd1 && cmd2, cmd1 || cmd2.
    List {
        left: Box<Command>,
        op: ListOp,
        right: Box<Command>,
    },
    /// Function definition: name() { body; }
    FunctionDef { name: String, body: Box<Command> },
    /// Brace group: { cmd1; cmd2; }
    Group { body: Vec<Command> },
}
