//! Named shell options toggled by `shopt` and the `-O`/`+O` startup flags.
//!
//! The registry in [`crate::state::ShellState`] is the authoritative mutable
//! copy. Evaluation reads a [`OptionSnapshot`] taken at the start of each
//! word, and the parser receives its grammar switches through
//! [`OptionRegistry::apply_to_parser_mode`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use wordsh_shell::ParserMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShellOption {
    StaticWordEval,
    StrictArray,
    OilParseAt,
}

/// Whether an option only affects evaluation, or also changes how later
/// source text is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    Session,
    Parse,
}

/// Where a `shopt` is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecScope {
    TopLevel,
    Function,
}

impl ShellOption {
    pub const ALL: [ShellOption; 3] = [
        ShellOption::StaticWordEval,
        ShellOption::StrictArray,
        ShellOption::OilParseAt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShellOption::StaticWordEval => "static-word-eval",
            ShellOption::StrictArray => "strict-array",
            ShellOption::OilParseAt => "oil-parse-at",
        }
    }

    pub fn scope(self) -> OptionScope {
        match self {
            ShellOption::OilParseAt => OptionScope::Parse,
            ShellOption::StaticWordEval | ShellOption::StrictArray => OptionScope::Session,
        }
    }
}

impl fmt::Display for ShellOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShellOption {
    type Err = OptionError;

    /// Accepts the dashed spelling and the underscore alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "-");
        ShellOption::ALL
            .into_iter()
            .find(|opt| opt.name() == normalized)
            .ok_or_else(|| OptionError::UnknownOption(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("{0}: invalid shell option name")]
    UnknownOption(String),

    #[error("{0} can only be set at the top level")]
    ScopeViolation(ShellOption),
}

/// Immutable copy of the option flags, cheap to pass by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionSnapshot {
    pub static_word_eval: bool,
    pub strict_array: bool,
    pub oil_parse_at: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    enabled: BTreeSet<ShellOption>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable an option as if from the top level (startup flags, tests).
    pub fn set(&mut self, name: &str) -> Result<(), OptionError> {
        self.apply(name, true, ExecScope::TopLevel).map(|_| ())
    }

    pub fn unset(&mut self, name: &str) -> Result<(), OptionError> {
        self.apply(name, false, ExecScope::TopLevel).map(|_| ())
    }

    /// Unknown names read as unset.
    pub fn is_set(&self, name: &str) -> bool {
        name.parse::<ShellOption>()
            .map(|opt| self.enabled(opt))
            .unwrap_or(false)
    }

    pub fn enabled(&self, opt: ShellOption) -> bool {
        self.enabled.contains(&opt)
    }

    /// Enable or disable `name` from `scope`. Returns the option that was
    /// changed so callers can react to parse-scope changes.
    pub fn apply(
        &mut self,
        name: &str,
        enable: bool,
        scope: ExecScope,
    ) -> Result<ShellOption, OptionError> {
        let opt: ShellOption = name.parse()?;
        if enable {
            if opt.scope() == OptionScope::Parse && scope != ExecScope::TopLevel {
                return Err(OptionError::ScopeViolation(opt));
            }
            self.enabled.insert(opt);
        } else {
            self.enabled.remove(&opt);
        }
        tracing::debug!(option = %opt, enable, "shell option changed");
        Ok(opt)
    }

    pub fn snapshot(&self) -> OptionSnapshot {
        OptionSnapshot {
            static_word_eval: self.enabled(ShellOption::StaticWordEval),
            strict_array: self.enabled(ShellOption::StrictArray),
            oil_parse_at: self.enabled(ShellOption::OilParseAt),
        }
    }

    /// Push parse-scope options into the parser's grammar mode.
    pub fn apply_to_parser_mode(&self, mode: &mut ParserMode) {
        mode.parse_at = self.enabled(ShellOption::OilParseAt);
    }

    pub fn parser_mode(&self) -> ParserMode {
        let mut mode = ParserMode::default();
        self.apply_to_parser_mode(&mut mode);
        mode
    }

    /// All options with their current state, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (ShellOption, bool)> + '_ {
        ShellOption::ALL
            .into_iter()
            .map(move |opt| (opt, self.enabled(opt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_unset_round_trip() {
        let mut opts = OptionRegistry::new();
        assert!(!opts.is_set("static-word-eval"));
        opts.set("static-word-eval").unwrap();
        assert!(opts.is_set("static-word-eval"));
        opts.unset("static-word-eval").unwrap();
        assert!(!opts.is_set("static-word-eval"));
    }

    #[test]
    fn underscore_alias_is_accepted() {
        let mut opts = OptionRegistry::new();
        opts.set("strict_array").unwrap();
        assert!(opts.enabled(ShellOption::StrictArray));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut opts = OptionRegistry::new();
        assert_eq!(
            opts.set("nope"),
            Err(OptionError::UnknownOption("nope".into()))
        );
        assert_eq!(
            opts.unset("nope"),
            Err(OptionError::UnknownOption("nope".into()))
        );
        assert!(!opts.is_set("nope"));
    }

    #[test]
    fn parse_at_only_at_top_level() {
        let mut opts = OptionRegistry::new();
        assert_eq!(
            opts.apply("oil-parse-at", true, ExecScope::Function),
            Err(OptionError::ScopeViolation(ShellOption::OilParseAt))
        );
        assert!(!opts.enabled(ShellOption::OilParseAt));
        opts.apply("oil-parse-at", true, ExecScope::TopLevel).unwrap();
        // Disabling is allowed anywhere.
        opts.apply("oil-parse-at", false, ExecScope::Function).unwrap();
        assert!(!opts.enabled(ShellOption::OilParseAt));
    }

    #[test]
    fn session_options_allowed_in_functions() {
        let mut opts = OptionRegistry::new();
        opts.apply("strict-array", true, ExecScope::Function).unwrap();
        assert!(opts.snapshot().strict_array);
    }

    #[test]
    fn parser_mode_follows_parse_at() {
        let mut opts = OptionRegistry::new();
        let mut mode = ParserMode::default();
        opts.set("oil-parse-at").unwrap();
        opts.apply_to_parser_mode(&mut mode);
        assert!(mode.parse_at);
        opts.unset("oil-parse-at").unwrap();
        assert_eq!(opts.parser_mode(), ParserMode::default());
    }

    #[test]
    fn snapshot_is_detached() {
        let mut opts = OptionRegistry::new();
        let before = opts.snapshot();
        opts.set("static-word-eval").unwrap();
        assert!(!before.static_word_eval);
        assert!(opts.snapshot().static_word_eval);
    }

    #[test]
    fn iter_lists_every_option() {
        let mut opts = OptionRegistry::new();
        opts.set("strict-array").unwrap();
        let listed: Vec<_> = opts.iter().collect();
        assert_eq!(
            listed,
            vec![
                (ShellOption::StaticWordEval, false),
                (ShellOption::StrictArray, true),
                (ShellOption::OilParseAt, false),
            ]
        );
    }
}
