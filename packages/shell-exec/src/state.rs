use std::collections::HashMap;

use wordsh_shell::ast::Command;

use crate::expand::VarStore;
use crate::options::{ExecScope, OptionRegistry};

pub const MAX_FUNCTION_DEPTH: u32 = 100;
pub const MAX_SOURCE_DEPTH: u32 = 64;

/// Default field separators when `IFS` is unset.
pub const DEFAULT_IFS: &str = " \t\n";

pub struct ShellState {
    pub env: HashMap<String, String>,
    pub arrays: HashMap<String, Vec<String>>,
    pub functions: HashMap<String, Command>,
    pub options: OptionRegistry,
    pub positional_args: Vec<String>,
    /// `$0`.
    pub script_name: String,
    pub last_exit_code: i32,
    pub function_depth: u32,
    pub source_depth: u32,
    /// Output accumulated since the state was created or last drained.
    pub stdout: String,
    pub stderr: String,
}

impl ShellState {
    pub fn new_default() -> Self {
        Self {
            env: HashMap::new(),
            arrays: HashMap::new(),
            functions: HashMap::new(),
            options: OptionRegistry::new(),
            positional_args: Vec::new(),
            script_name: "wordsh".into(),
            last_exit_code: 0,
            function_depth: 0,
            source_depth: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Scope in which `shopt` currently runs.
    pub fn exec_scope(&self) -> ExecScope {
        if self.function_depth > 0 {
            ExecScope::Function
        } else {
            ExecScope::TopLevel
        }
    }

    /// Assign a scalar, replacing any array of the same name.
    pub fn set_var(&mut self, name: &str, value: String) {
        self.arrays.remove(name);
        self.env.insert(name.to_string(), value);
    }

    /// Assign an indexed array, replacing any scalar of the same name.
    pub fn set_array(&mut self, name: &str, values: Vec<String>) {
        self.env.remove(name);
        self.arrays.insert(name.to_string(), values);
    }

    pub fn unset_var(&mut self, name: &str) {
        self.env.remove(name);
        self.arrays.remove(name);
    }

    pub fn write_out(&mut self, text: &str) {
        self.stdout.push_str(text);
    }

    pub fn write_err(&mut self, text: &str) {
        self.stderr.push_str(text);
    }

    /// Take the output collected so far.
    pub fn drain_output(&mut self) -> (String, String) {
        (
            std::mem::take(&mut self.stdout),
            std::mem::take(&mut self.stderr),
        )
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new_default()
    }
}

/// Split `name[index]` into its name and index.
fn parse_element_ref(name: &str) -> Option<(&str, &str)> {
    let open = name.find('[')?;
    let index = name[open + 1..].strip_suffix(']')?;
    Some((&name[..open], index))
}

fn element_at(values: &[String], index: &str) -> Option<String> {
    let mut idx: isize = index.trim().parse().ok()?;
    if idx < 0 {
        idx += values.len() as isize;
    }
    usize::try_from(idx)
        .ok()
        .and_then(|i| values.get(i))
        .cloned()
}

impl VarStore for ShellState {
    fn lookup_scalar(&self, name: &str) -> Option<String> {
        match name {
            "?" => return Some(self.last_exit_code.to_string()),
            "#" => return Some(self.positional_args.len().to_string()),
            "$" => return Some(std::process::id().to_string()),
            "!" => return None,
            _ => {}
        }

        if let Ok(idx) = name.parse::<usize>() {
            if idx == 0 {
                return Some(self.script_name.clone());
            }
            return self.positional_args.get(idx - 1).cloned();
        }

        if let Some((array, index)) = parse_element_ref(name) {
            if let Some(values) = self.arrays.get(array) {
                return element_at(values, index);
            }
            // A scalar is an array of one element.
            return match index.trim() {
                "0" | "-1" => self.env.get(array).cloned(),
                _ => None,
            };
        }

        if let Some(value) = self.env.get(name) {
            return Some(value.clone());
        }
        // `$a` on an array reads its first element.
        self.arrays.get(name).and_then(|values| values.first().cloned())
    }

    fn lookup_array(&self, name: &str) -> Option<Vec<String>> {
        if let Some(values) = self.arrays.get(name) {
            return Some(values.clone());
        }
        self.env.get(name).map(|value| vec![value.clone()])
    }

    fn positional_args(&self) -> Vec<String> {
        self.positional_args.clone()
    }

    fn current_ifs(&self) -> String {
        self.env
            .get("IFS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_IFS.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ShellState {
        let mut state = ShellState::new_default();
        state.set_var("x", "1".into());
        state.set_array("a", vec!["p".into(), "q".into(), "r".into()]);
        state.positional_args = vec!["one".into(), "two".into()];
        state.last_exit_code = 3;
        state
    }

    #[test]
    fn special_parameters() {
        let state = state();
        assert_eq!(state.lookup_scalar("?").as_deref(), Some("3"));
        assert_eq!(state.lookup_scalar("#").as_deref(), Some("2"));
        assert_eq!(state.lookup_scalar("0").as_deref(), Some("wordsh"));
        assert_eq!(state.lookup_scalar("2").as_deref(), Some("two"));
        assert_eq!(state.lookup_scalar("3"), None);
    }

    #[test]
    fn array_elements() {
        let state = state();
        assert_eq!(state.lookup_scalar("a[1]").as_deref(), Some("q"));
        assert_eq!(state.lookup_scalar("a[-1]").as_deref(), Some("r"));
        assert_eq!(state.lookup_scalar("a[9]"), None);
        assert_eq!(state.lookup_scalar("a").as_deref(), Some("p"));
        assert_eq!(state.lookup_scalar("x[0]").as_deref(), Some("1"));
    }

    #[test]
    fn scalar_reads_as_one_element_array() {
        let state = state();
        assert_eq!(state.lookup_array("x"), Some(vec!["1".to_string()]));
        assert_eq!(state.lookup_array("missing"), None);
    }

    #[test]
    fn scalar_and_array_namespaces_replace_each_other() {
        let mut state = state();
        state.set_var("a", "flat".into());
        assert!(!state.arrays.contains_key("a"));
        state.set_array("x", vec![]);
        assert!(!state.env.contains_key("x"));
        state.unset_var("x");
        assert_eq!(state.lookup_array("x"), None);
    }

    #[test]
    fn ifs_defaults_to_whitespace() {
        let mut state = state();
        assert_eq!(state.current_ifs(), " \t\n");
        state.set_var("IFS", ":".into());
        assert_eq!(state.current_ifs(), ":");
    }

    #[test]
    fn exec_scope_follows_function_depth() {
        let mut state = state();
        assert_eq!(state.exec_scope(), ExecScope::TopLevel);
        state.function_depth = 1;
        assert_eq!(state.exec_scope(), ExecScope::Function);
    }
}
