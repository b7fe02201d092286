use thiserror::Error;
use wordsh_shell::ast::{Word, WordPart};

use crate::glob::escape_glob;
use crate::host::HostInterface;
use crate::options::{OptionRegistry, OptionSnapshot};

// ---------------------------------------------------------------------------
// Collaborators and policy
// ---------------------------------------------------------------------------

/// Read access to shell variables during evaluation.
pub trait VarStore {
    /// Scalar value of `name`; also resolves `?`, `#`, positional digits and
    /// `name[index]`. `None` when unset.
    fn lookup_scalar(&self, name: &str) -> Option<String>;
    /// Elements of an indexed array. `None` when unset.
    fn lookup_array(&self, name: &str) -> Option<Vec<String>>;
    fn positional_args(&self) -> Vec<String>;
    /// Field separator characters. An unset IFS reports the default
    /// whitespace set, so an empty string always means IFS is set but empty.
    fn current_ifs(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordMode {
    /// Split, glob and elide unquoted substitutions.
    Legacy,
    /// Every substitution is exactly one field, taken literally.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMode {
    /// A glob next to a splice merges into the neighbouring element.
    Lenient,
    /// A glob next to a splice is an error.
    Strict,
}

/// How words are evaluated, fixed for the duration of one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalPolicy {
    pub words: WordMode,
    pub arrays: ArrayMode,
}

impl EvalPolicy {
    pub fn from_snapshot(snapshot: OptionSnapshot) -> Self {
        EvalPolicy {
            words: if snapshot.static_word_eval {
                WordMode::Static
            } else {
                WordMode::Legacy
            },
            arrays: if snapshot.strict_array {
                ArrayMode::Strict
            } else {
                ArrayMode::Lenient
            },
        }
    }
}

impl Default for EvalPolicy {
    fn default() -> Self {
        Self::from_snapshot(OptionSnapshot::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("strict-array: array splice next to a glob pattern in `{word}`")]
    StrictArrayConflict { word: String },
}

/// One output unit of a word before filename expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Done(String),
    /// Still carries active glob metacharacters. `pattern` has every
    /// inactive metacharacter backslash-escaped; `literal` is the text to
    /// fall back to when nothing matches.
    PendingGlob { pattern: String, literal: String },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate each word under the options in effect when that word starts.
pub fn eval_words(
    words: &[Word],
    options: &OptionRegistry,
    vars: &dyn VarStore,
    host: &dyn HostInterface,
) -> Result<Vec<String>, ExpandError> {
    let mut argv = Vec::new();
    for word in words {
        let policy = EvalPolicy::from_snapshot(options.snapshot());
        argv.extend(eval_word(word, policy, vars, host)?);
    }
    Ok(argv)
}

/// Evaluate one word to its final fields.
pub fn eval_word(
    word: &Word,
    policy: EvalPolicy,
    vars: &dyn VarStore,
    host: &dyn HostInterface,
) -> Result<Vec<String>, ExpandError> {
    let fields = word_fields(word, policy, vars)?;
    let argv: Vec<String> = fields
        .into_iter()
        .flat_map(|field| expand_field(host, field))
        .collect();
    tracing::trace!(word = %describe_word(word), ?policy, ?argv, "evaluated word");
    Ok(argv)
}

/// Evaluate a word into fields without touching the filesystem.
pub fn word_fields(
    word: &Word,
    policy: EvalPolicy,
    vars: &dyn VarStore,
) -> Result<Vec<Field>, ExpandError> {
    check_strict_array(word, policy)?;

    let ifs = vars.current_ifs();
    let mut builder = FieldBuilder::default();

    for part in &word.parts {
        match part {
            WordPart::Literal(text) => builder.push_quoted(text),
            WordPart::GlobPattern(text) => builder.push_pattern(text),
            WordPart::VarSub { name, quoted } => {
                let value = vars.lookup_scalar(name).unwrap_or_default();
                builder.push_value(&value, *quoted, policy, &ifs);
            }
            WordPart::ArraySub {
                name,
                splice,
                quoted,
            } => {
                let elements = vars.lookup_array(name).unwrap_or_default();
                builder.push_elements(&elements, *splice, *quoted, policy, &ifs);
            }
            WordPart::PositionalArgs { splice, quoted } => {
                let elements = vars.positional_args();
                builder.push_elements(&elements, *splice, *quoted, policy, &ifs);
            }
        }
    }

    Ok(builder.finish_word())
}

/// Evaluate the right-hand side of an assignment: one string, never split,
/// globbed or elided. Splices are joined with a space.
pub fn eval_assignment_word(word: &Word, vars: &dyn VarStore) -> String {
    let mut value = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(text) | WordPart::GlobPattern(text) => value.push_str(text),
            WordPart::VarSub { name, .. } => {
                value.push_str(&vars.lookup_scalar(name).unwrap_or_default());
            }
            WordPart::ArraySub { name, splice, .. } => {
                let elements = vars.lookup_array(name).unwrap_or_default();
                value.push_str(&join_elements(&elements, *splice, &vars.current_ifs()));
            }
            WordPart::PositionalArgs { splice, .. } => {
                let elements = vars.positional_args();
                value.push_str(&join_elements(&elements, *splice, &vars.current_ifs()));
            }
        }
    }
    value
}

/// Split a substituted value on runs of `ifs` characters. Leading and
/// trailing separators produce nothing; an empty `ifs` disables splitting.
pub fn split_fields(value: &str, ifs: &str) -> Vec<String> {
    if ifs.is_empty() {
        return if value.is_empty() {
            Vec::new()
        } else {
            vec![value.to_string()]
        };
    }
    value
        .split(|c: char| ifs.contains(c))
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Finalize a field: sorted filesystem matches for a pending glob, or its
/// literal text when nothing matches.
pub fn expand_field(host: &dyn HostInterface, field: Field) -> Vec<String> {
    match field {
        Field::Done(text) => vec![text],
        Field::PendingGlob { pattern, literal } => match host.glob(&pattern) {
            Ok(mut matches) if !matches.is_empty() => {
                matches.sort();
                matches
            }
            Ok(_) => vec![literal],
            Err(err) => {
                tracing::debug!(%pattern, %err, "glob failed; keeping literal");
                vec![literal]
            }
        },
    }
}

/// Reject a splice sharing a word with a glob pattern under strict-array.
pub fn check_strict_array(word: &Word, policy: EvalPolicy) -> Result<(), ExpandError> {
    if policy.arrays != ArrayMode::Strict {
        return Ok(());
    }
    let has_splice = word.parts.iter().any(WordPart::is_splice);
    let has_glob = word
        .parts
        .iter()
        .any(|part| matches!(part, WordPart::GlobPattern(_)));
    if has_splice && has_glob {
        let word = describe_word(word);
        tracing::debug!(%word, "strict-array conflict");
        return Err(ExpandError::StrictArrayConflict { word });
    }
    Ok(())
}

/// Render a word roughly as it was written, for messages.
pub fn describe_word(word: &Word) -> String {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(text) | WordPart::GlobPattern(text) => out.push_str(text),
            WordPart::VarSub { name, .. } => out.push_str(&format!("${{{name}}}")),
            WordPart::ArraySub { name, splice, .. } => {
                let subscript = if *splice { '@' } else { '*' };
                out.push_str(&format!("${{{name}[{subscript}]}}"));
            }
            WordPart::PositionalArgs { splice, .. } => {
                out.push_str(if *splice { "$@" } else { "$*" });
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Field assembly
// ---------------------------------------------------------------------------

/// Joins `$*`-style elements with the first IFS character; an IFS that is
/// set but empty joins with nothing.
fn join_elements(elements: &[String], splice: bool, ifs: &str) -> String {
    let sep = if splice {
        " ".to_string()
    } else {
        ifs.chars().next().map(String::from).unwrap_or_default()
    };
    elements.join(&sep)
}

/// Accumulates the current field. A field exists once any part has
/// contributed to it, even with empty text; unquoted empty substitutions
/// never start one, which is how elision happens.
#[derive(Default)]
struct FieldBuilder {
    fields: Vec<Field>,
    /// Text as written.
    literal: String,
    /// The same text with inactive metacharacters escaped.
    pattern: String,
    has_glob: bool,
    started: bool,
}

impl FieldBuilder {
    /// Text that is never split or globbed.
    fn push_quoted(&mut self, text: &str) {
        self.literal.push_str(text);
        self.pattern.push_str(&escape_glob(text));
        self.started = true;
    }

    /// Source-level glob text; active in every mode.
    fn push_pattern(&mut self, text: &str) {
        self.literal.push_str(text);
        self.pattern.push_str(text);
        self.has_glob = true;
        self.started = true;
    }

    /// An unquoted legacy value: its metacharacters stay active.
    fn push_active(&mut self, text: &str) {
        self.literal.push_str(text);
        self.pattern.push_str(&text.replace('\\', "\\\\"));
        if text.contains(['*', '?', '[']) {
            self.has_glob = true;
        }
        self.started = true;
    }

    fn push_value(&mut self, value: &str, quoted: bool, policy: EvalPolicy, ifs: &str) {
        if quoted || policy.words == WordMode::Static {
            self.push_quoted(value);
        } else {
            self.push_split(value, ifs);
        }
    }

    fn push_split(&mut self, value: &str, ifs: &str) {
        let is_sep = |c: char| ifs.contains(c);
        if value.starts_with(is_sep) {
            self.end_field();
        }
        for (i, piece) in split_fields(value, ifs).iter().enumerate() {
            if i > 0 {
                self.end_field();
            }
            self.push_active(piece);
        }
        if value.ends_with(is_sep) {
            self.end_field();
        }
    }

    /// The first element joins the text before it and the last joins the
    /// text after it; every element in between is its own field.
    fn push_elements(
        &mut self,
        elements: &[String],
        splice: bool,
        quoted: bool,
        policy: EvalPolicy,
        ifs: &str,
    ) {
        if !splice {
            let joined = join_elements(elements, false, ifs);
            self.push_value(&joined, quoted, policy, ifs);
            return;
        }
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                self.end_field();
            }
            self.push_value(element, quoted, policy, ifs);
        }
    }

    fn end_field(&mut self) {
        if !self.started {
            return;
        }
        let literal = std::mem::take(&mut self.literal);
        let pattern = std::mem::take(&mut self.pattern);
        self.fields.push(if self.has_glob {
            Field::PendingGlob { pattern, literal }
        } else {
            Field::Done(literal)
        });
        self.has_glob = false;
        self.started = false;
    }

    fn finish_word(mut self) -> Vec<Field> {
        self.end_field();
        self.fields
    }
}
