use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::glob::{CompiledGlob, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("invalid glob pattern: {0}")]
    BadPattern(String),
}

impl HostError {
    fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => HostError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => HostError::PermissionDenied(path.to_string()),
            _ => HostError::IoError(format!("{path}: {err}")),
        }
    }
}

// ---------------------------------------------------------------------------
// HostInterface trait — implemented by LocalHost or test stubs
// ---------------------------------------------------------------------------

/// Everything the shell needs from the outside world.
pub trait HostInterface {
    /// Paths matching a glob pattern (backslash escapes a metacharacter).
    /// Order is unspecified; an empty list means no match.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, HostError>;

    /// Read a whole file, for `source`.
    fn read_file(&self, path: &str) -> Result<String, HostError>;
}

// ---------------------------------------------------------------------------
// LocalHost — the real filesystem
// ---------------------------------------------------------------------------

/// Host backed by the local filesystem. Relative paths resolve against
/// `cwd`, and relative patterns produce relative matches.
#[derive(Debug, Clone)]
pub struct LocalHost {
    cwd: PathBuf,
}

impl LocalHost {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Host rooted at the process working directory.
    pub fn current_dir() -> Result<Self, HostError> {
        let cwd = std::env::current_dir().map_err(|e| HostError::from_io(".", e))?;
        Ok(Self::new(cwd))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }

    /// Entry names of a directory; unreadable directories have none.
    fn list_dir(&self, dir: &str) -> Vec<String> {
        let path = if dir.is_empty() {
            self.cwd.clone()
        } else {
            self.resolve(dir)
        };
        let Ok(entries) = fs::read_dir(&path) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect()
    }
}

/// Append a name to a pattern-shaped path prefix.
fn join_prefix(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

impl HostInterface for LocalHost {
    fn glob(&self, pattern: &str) -> Result<Vec<String>, HostError> {
        let compiled =
            CompiledGlob::new(pattern).map_err(|e| HostError::BadPattern(e.to_string()))?;

        let root = if compiled.is_absolute() { "/" } else { "" };
        let mut candidates = vec![root.to_string()];
        let last = compiled.segments().len().saturating_sub(1);

        for (idx, segment) in compiled.segments().iter().enumerate() {
            let mut next = Vec::new();
            for prefix in &candidates {
                match segment {
                    Segment::Literal(name) => {
                        let path = join_prefix(prefix, name);
                        if self.resolve(&path).exists() {
                            next.push(path);
                        }
                    }
                    Segment::Pattern { .. } => {
                        for name in self.list_dir(prefix) {
                            if !segment.matches(&name) {
                                continue;
                            }
                            let path = join_prefix(prefix, &name);
                            // Intermediate segments must be directories.
                            if idx == last || self.resolve(&path).is_dir() {
                                next.push(path);
                            }
                        }
                    }
                }
            }
            candidates = next;
            if candidates.is_empty() {
                break;
            }
        }

        if compiled.segments().is_empty() {
            return Ok(Vec::new());
        }
        tracing::trace!(pattern, matches = candidates.len(), "glob");
        Ok(candidates)
    }

    fn read_file(&self, path: &str) -> Result<String, HostError> {
        fs::read_to_string(self.resolve(path)).map_err(|e| HostError::from_io(path, e))
    }
}
