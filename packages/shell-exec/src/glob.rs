//! Shell glob patterns (`*`, `?`, `[...]`) compiled to anchored regexes.
//!
//! A backslash makes the next character literal. Patterns are matched one
//! path segment at a time; `*` and `?` never cross a `/`, and a leading `.`
//! in a name must be matched explicitly.

use regex::Regex;

/// True if `pattern` has at least one unescaped glob metacharacter.
pub fn has_glob_meta(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

/// Make every character of `text` match literally.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Drop the escaping backslashes from a pattern.
pub fn unescape_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// One `/`-separated piece of a pattern.
#[derive(Debug, Clone)]
pub enum Segment {
    /// No metacharacters: the name must exist as written.
    Literal(String),
    Pattern { regex: Regex, dotfiles: bool },
}

impl Segment {
    fn compile(segment: &str) -> Result<Segment, regex::Error> {
        if !has_glob_meta(segment) {
            return Ok(Segment::Literal(unescape_glob(segment)));
        }
        let dotfiles = segment.starts_with('.') || segment.starts_with("\\.");
        let regex = Regex::new(&format!("^(?s:{})$", translate(segment)))?;
        Ok(Segment::Pattern { regex, dotfiles })
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == name,
            Segment::Pattern { regex, dotfiles } => {
                if name.starts_with('.') && !dotfiles {
                    return false;
                }
                regex.is_match(name)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledGlob {
    absolute: bool,
    segments: Vec<Segment>,
}

impl CompiledGlob {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let absolute = pattern.starts_with('/');
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledGlob { absolute, segments })
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a complete path written in the same form as the pattern.
    pub fn matches_path(&self, path: &str) -> bool {
        if path.starts_with('/') != self.absolute {
            return false;
        }
        let names: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        names.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(names)
                .all(|(segment, name)| segment.matches(name))
    }
}

/// Translate one segment to regex syntax.
fn translate(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push_str(&regex::escape(&chars[i + 1].to_string()));
                i += 2;
            }
            '*' => {
                out.push_str(".*");
                i += 1;
            }
            '?' => {
                out.push('.');
                i += 1;
            }
            '[' => match translate_class(&chars[i..]) {
                Some((class, consumed)) => {
                    out.push_str(&class);
                    i += consumed;
                }
                None => {
                    // No closing bracket: a literal '['.
                    out.push_str(r"\[");
                    i += 1;
                }
            },
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out
}

/// Translate a bracket expression starting at `chars[0] == '['`. Returns the
/// regex class and the number of characters consumed.
fn translate_class(chars: &[char]) -> Option<(String, usize)> {
    let mut i = 1;
    let negate = matches!(chars.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }
    let body_start = i;
    // A ']' right after the opening bracket is a member, not the end.
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() && chars[i] != ']' {
        i += 1;
    }
    if i >= chars.len() {
        return None;
    }
    let body = &chars[body_start..i];

    let mut class = String::from("[");
    if negate {
        class.push('^');
    }
    for (j, &c) in body.iter().enumerate() {
        let is_range = c == '-' && j > 0 && j + 1 < body.len();
        if is_range {
            class.push('-');
        } else {
            class.push_str(&regex::escape(&c.to_string()));
        }
    }
    class.push(']');
    Some((class, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob_match(pattern: &str, path: &str) -> bool {
        CompiledGlob::new(pattern).unwrap().matches_path(path)
    }

    #[test]
    fn detects_metacharacters() {
        assert!(has_glob_meta("*.txt"));
        assert!(has_glob_meta("a?"));
        assert!(has_glob_meta("[ab]"));
        assert!(!has_glob_meta("plain"));
        assert!(!has_glob_meta(r"\*.txt"));
    }

    #[test]
    fn escape_then_unescape() {
        let escaped = escape_glob("a*b[c]\\");
        assert_eq!(escaped, r"a\*b\[c\]\\");
        assert!(!has_glob_meta(&escaped));
        assert_eq!(unescape_glob(&escaped), "a*b[c]\\");
    }

    #[test]
    fn star_and_question() {
        assert!(glob_match("*.txt", "foo.txt"));
        assert!(glob_match("sp*.txt", "spam.txt"));
        assert!(!glob_match("sp*.txt", "foo.txt"));
        assert!(glob_match("f?o", "foo"));
        assert!(!glob_match("f?o", "fooo"));
    }

    #[test]
    fn bracket_classes() {
        assert!(glob_match("[bf]oo", "foo"));
        assert!(!glob_match("[!bf]oo", "foo"));
        assert!(glob_match("[a-c]x", "bx"));
        assert!(!glob_match("[a-c]x", "dx"));
        assert!(glob_match("[]]", "]"));
        assert!(glob_match("a[", "a["));
    }

    #[test]
    fn escaped_metacharacters_are_literal() {
        assert!(glob_match(r"f\*.txt", "f*.txt"));
        assert!(!glob_match(r"f\*.txt", "foo.txt"));
        assert!(glob_match(r"f\*o*", "f*oo"));
    }

    #[test]
    fn regex_characters_are_literal() {
        assert!(glob_match("a.b+*", "a.b+c"));
        assert!(!glob_match("a.b*", "axb"));
    }

    #[test]
    fn leading_dot_needs_explicit_match() {
        assert!(!glob_match("*", ".hidden"));
        assert!(glob_match(".*", ".hidden"));
        assert!(glob_match("?x", "ax"));
    }

    #[test]
    fn segments_do_not_cross_slashes() {
        assert!(glob_match("*/*.txt", "dir/a.txt"));
        assert!(!glob_match("*.txt", "dir/a.txt"));
        assert!(glob_match("/tmp/*", "/tmp/x"));
        assert!(!glob_match("/tmp/*", "tmp/x"));
    }
}
