use serde::{Deserialize, Serialize};
use thiserror::Error;
use wordsh_shell::ParseError;

use crate::expand::ExpandError;
use crate::options::OptionError;

/// Collected output and final status of a unit of source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn success(stdout: String) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        }
    }

    pub fn error(code: i32, stderr: String) -> Self {
        Self {
            exit_code: code,
            stdout: String::new(),
            stderr,
        }
    }
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Normal(i32),
    Return(i32),
    Exit(i32),
}

impl ControlFlow {
    pub fn status(self) -> i32 {
        match self {
            ControlFlow::Normal(code) | ControlFlow::Return(code) | ControlFlow::Exit(code) => code,
        }
    }
}

/// Errors that abort the current unit of source.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error("shopt: {0}")]
    Option(#[from] OptionError),

    #[error("maximum function call depth exceeded")]
    FunctionTooDeep,

    #[error("source: maximum nesting depth exceeded")]
    SourceTooDeep,
}

impl ShellError {
    /// Exit status reported when this error ends a unit.
    pub fn exit_status(&self) -> i32 {
        match self {
            ShellError::Parse(_) => 2,
            _ => 1,
        }
    }
}
