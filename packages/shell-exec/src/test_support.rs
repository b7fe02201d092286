#[cfg(test)]
pub mod mock {
    use std::collections::BTreeMap;

    use crate::glob::CompiledGlob;
    use crate::host::{HostError, HostInterface};

    /// An in-memory mock implementation of `HostInterface` for testing.
    #[derive(Debug, Default)]
    pub struct MockHost {
        files: BTreeMap<String, String>,
    }

    impl MockHost {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a file with the given content.
        pub fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files.insert(path.to_string(), content.to_string());
            self
        }

        /// Add empty files, e.g. to be matched by globs.
        pub fn with_files(mut self, paths: &[&str]) -> Self {
            for path in paths {
                self.files.insert(path.to_string(), String::new());
            }
            self
        }
    }

    impl HostInterface for MockHost {
        fn glob(&self, pattern: &str) -> Result<Vec<String>, HostError> {
            let compiled =
                CompiledGlob::new(pattern).map_err(|e| HostError::BadPattern(e.to_string()))?;
            // Reverse order; results are sorted by the caller.
            Ok(self
                .files
                .keys()
                .rev()
                .filter(|path| compiled.matches_path(path))
                .cloned()
                .collect())
        }

        fn read_file(&self, path: &str) -> Result<String, HostError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| HostError::NotFound(path.to_string()))
        }
    }
}
