//! Shell builtin commands.
//!
//! Everything a script can run is a builtin or a shell function; there is no
//! external command execution.

use crate::control::{ControlFlow, RunResult, ShellError};
use crate::host::HostInterface;
use crate::options::{OptionError, ShellOption};
use crate::state::{ShellState, MAX_SOURCE_DEPTH};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of a builtin execution.
#[derive(Debug)]
pub enum BuiltinResult {
    /// Normal command result (stdout, stderr, exit code).
    Result(RunResult),
    /// The `exit` builtin was invoked with the given code.
    Exit(i32),
    /// The `return` builtin was invoked with the given code.
    Return(i32),
}

/// Callback that parses and executes a unit of source in the current shell.
/// Used by `source`.
pub type RunFn<'a> = &'a dyn Fn(&mut ShellState, &str) -> Result<ControlFlow, ShellError>;

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Try to handle `cmd_name` as a shell builtin.
///
/// Returns `None` if `cmd_name` is not a builtin. An `Err` is fatal for the
/// unit being run.
pub fn try_builtin(
    state: &mut ShellState,
    host: &dyn HostInterface,
    cmd_name: &str,
    args: &[String],
    run: Option<RunFn>,
) -> Option<Result<BuiltinResult, ShellError>> {
    let result = match cmd_name {
        "argv" => Ok(builtin_argv(args)),
        "echo" => Ok(builtin_echo(args)),
        "true" | ":" => Ok(BuiltinResult::Result(RunResult::empty())),
        "false" => Ok(BuiltinResult::Result(RunResult::error(1, String::new()))),
        "shopt" => builtin_shopt(state, args),
        "set" => Ok(builtin_set(state, args)),
        "unset" => Ok(builtin_unset(state, args)),
        "source" | "." => builtin_source(state, host, args, run),
        "return" => Ok(builtin_return(state, args)),
        "exit" => Ok(builtin_exit(state, args)),
        _ => return None,
    };
    Some(result)
}

// ---------------------------------------------------------------------------
// Individual builtins
// ---------------------------------------------------------------------------

// -- argv -----------------------------------------------------------------

/// Print the arguments as a Python list literal, one line.
fn builtin_argv(args: &[String]) -> BuiltinResult {
    let items: Vec<String> = args.iter().map(|a| python_repr(a)).collect();
    BuiltinResult::Result(RunResult::success(format!("[{}]\n", items.join(", "))))
}

/// Quote a string the way Python's `repr()` does.
pub fn python_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

// -- echo -----------------------------------------------------------------

fn builtin_echo(args: &[String]) -> BuiltinResult {
    let mut newline = true;
    let mut interpret_escapes = false;
    let mut arg_start = 0;

    // Only leading args matching /^-[neE]+$/ are flags.
    for (i, arg) in args.iter().enumerate() {
        let Some(flags) = arg.strip_prefix('-') else {
            break;
        };
        if flags.is_empty() || !flags.chars().all(|c| "neE".contains(c)) {
            break;
        }
        for ch in flags.chars() {
            match ch {
                'n' => newline = false,
                'e' => interpret_escapes = true,
                _ => interpret_escapes = false,
            }
        }
        arg_start = i + 1;
    }

    let body = args[arg_start..].join(" ");
    let (mut text, stopped) = if interpret_escapes {
        interpret_echo_escapes(&body)
    } else {
        (body, false)
    };
    // \c suppresses the trailing newline
    if newline && !stopped {
        text.push('\n');
    }

    BuiltinResult::Result(RunResult::success(text))
}

/// Interpret echo escape sequences. Returns (output, stop) where stop=true
/// means `\c` was encountered.
fn interpret_echo_escapes(s: &str) -> (String, bool) {
    let mut out = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0C'),
            'v' => out.push('\x0B'),
            'c' => return (out, true),
            '0' => {
                let mut val = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            val = val * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(val));
            }
            'x' => {
                let mut val = 0u32;
                let mut count = 0;
                while count < 2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(d) => {
                            val = val * 16 + d;
                            chars.next();
                            count += 1;
                        }
                        None => break,
                    }
                }
                if count > 0 {
                    out.extend(char::from_u32(val));
                } else {
                    out.push_str("\\x");
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    (out, false)
}

// -- shopt ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShoptAction {
    Show,
    Set,
    Unset,
}

fn shopt_line(opt: ShellOption, on: bool) -> String {
    format!("{:<20}\t{}\n", opt.name(), if on { "on" } else { "off" })
}

fn shopt_command(opt: ShellOption, on: bool) -> String {
    format!("shopt {} {}\n", if on { "-s" } else { "-u" }, opt.name())
}

/// `shopt [-s|-u] [-p] [-q] [name ...]`
///
/// An unknown name is reported and makes the status 1; the remaining names
/// are still processed. A scope violation is fatal.
fn builtin_shopt(state: &mut ShellState, args: &[String]) -> Result<BuiltinResult, ShellError> {
    let mut action = ShoptAction::Show;
    let mut print_commands = false;
    let mut quiet = false;
    let mut idx = 0;

    while let Some(arg) = args.get(idx) {
        if arg == "--" {
            idx += 1;
            break;
        }
        let Some(flags) = arg.strip_prefix('-').filter(|f| !f.is_empty()) else {
            break;
        };
        for flag in flags.chars() {
            match flag {
                's' => action = ShoptAction::Set,
                'u' => action = ShoptAction::Unset,
                'p' => print_commands = true,
                'q' => quiet = true,
                other => {
                    return Ok(BuiltinResult::Result(RunResult::error(
                        2,
                        format!("shopt: -{other}: invalid option\nshopt: usage: shopt [-pqsu] [optname ...]\n"),
                    )))
                }
            }
        }
        idx += 1;
    }
    let names = &args[idx..];

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut status = 0;

    if names.is_empty() {
        // List every option, or only those matching -s / -u.
        for (opt, on) in state.options.iter() {
            let wanted = match action {
                ShoptAction::Show => true,
                ShoptAction::Set => on,
                ShoptAction::Unset => !on,
            };
            if wanted && !quiet {
                stdout.push_str(&if print_commands {
                    shopt_command(opt, on)
                } else {
                    shopt_line(opt, on)
                });
            }
        }
        return Ok(BuiltinResult::Result(RunResult {
            exit_code: 0,
            stdout,
            stderr,
        }));
    }

    let scope = state.exec_scope();
    for name in names {
        let outcome = match action {
            ShoptAction::Set => state.options.apply(name, true, scope).map(|_| ()),
            ShoptAction::Unset => state.options.apply(name, false, scope).map(|_| ()),
            ShoptAction::Show => name.parse::<ShellOption>().map(|opt| {
                let on = state.options.enabled(opt);
                if !on {
                    status = 1;
                }
                if !quiet {
                    stdout.push_str(&if print_commands {
                        shopt_command(opt, on)
                    } else {
                        shopt_line(opt, on)
                    });
                }
            }),
        };
        match outcome {
            Ok(()) => {}
            Err(err @ OptionError::UnknownOption(_)) => {
                stderr.push_str(&format!("shopt: {err}\n"));
                status = 1;
            }
            Err(err @ OptionError::ScopeViolation(_)) => return Err(err.into()),
        }
    }

    Ok(BuiltinResult::Result(RunResult {
        exit_code: status,
        stdout,
        stderr,
    }))
}

// -- set ------------------------------------------------------------------

fn builtin_set(state: &mut ShellState, args: &[String]) -> BuiltinResult {
    let Some(first) = args.first() else {
        // Print variables, sorted by name.
        let mut names: Vec<&String> = state.env.keys().chain(state.arrays.keys()).collect();
        names.sort();
        let mut output = String::new();
        for name in names {
            if let Some(value) = state.env.get(name) {
                output.push_str(&format!("{name}={}\n", python_repr(value)));
            } else if let Some(values) = state.arrays.get(name) {
                let items: Vec<String> = values.iter().map(|v| python_repr(v)).collect();
                output.push_str(&format!("{name}=({})\n", items.join(" ")));
            }
        }
        return BuiltinResult::Result(RunResult::success(output));
    };

    if first == "--" {
        state.positional_args = args[1..].to_vec();
    } else if first.starts_with('-') || first.starts_with('+') {
        return BuiltinResult::Result(RunResult::error(2, format!("set: {first}: invalid option\n")));
    } else {
        state.positional_args = args.to_vec();
    }
    BuiltinResult::Result(RunResult::empty())
}

// -- unset ----------------------------------------------------------------

fn builtin_unset(state: &mut ShellState, args: &[String]) -> BuiltinResult {
    let mut functions = false;
    let mut names = args;
    while let Some(flag) = names.first() {
        match flag.as_str() {
            "-f" => functions = true,
            "-v" => functions = false,
            _ => break,
        }
        names = &names[1..];
    }

    for name in names {
        if functions {
            state.functions.remove(name);
            continue;
        }
        // arr[idx] removes one element.
        if let Some((array, index)) = name.strip_suffix(']').and_then(|n| n.split_once('[')) {
            if let (Some(values), Ok(idx)) = (state.arrays.get_mut(array), index.parse::<usize>())
            {
                if idx < values.len() {
                    values.remove(idx);
                }
            }
            continue;
        }
        state.unset_var(name);
    }

    BuiltinResult::Result(RunResult::empty())
}

// -- source / . -----------------------------------------------------------

fn builtin_source(
    state: &mut ShellState,
    host: &dyn HostInterface,
    args: &[String],
    run: Option<RunFn>,
) -> Result<BuiltinResult, ShellError> {
    let Some(path) = args.first() else {
        return Ok(BuiltinResult::Result(RunResult::error(
            2,
            "source: filename argument required\n".into(),
        )));
    };
    let Some(run_fn) = run else {
        return Ok(BuiltinResult::Result(RunResult::error(
            1,
            "source: no runner available\n".into(),
        )));
    };
    if state.source_depth >= MAX_SOURCE_DEPTH {
        return Err(ShellError::SourceTooDeep);
    }

    let content = match host.read_file(path) {
        Ok(c) => c,
        Err(e) => {
            return Ok(BuiltinResult::Result(RunResult::error(
                1,
                format!("source: {path}: {e}\n"),
            )))
        }
    };

    // Strip shebang line
    let script = if content.starts_with("#!") {
        content.find('\n').map_or("", |pos| &content[pos + 1..])
    } else {
        &content
    };

    tracing::debug!(%path, depth = state.source_depth + 1, "sourcing");

    // Extra arguments replace the positional parameters for the duration.
    let saved_args = (args.len() > 1)
        .then(|| std::mem::replace(&mut state.positional_args, args[1..].to_vec()));
    state.source_depth += 1;
    let result = run_fn(state, script);
    state.source_depth -= 1;
    if let Some(saved) = saved_args {
        state.positional_args = saved;
    }

    Ok(match result? {
        ControlFlow::Normal(code) | ControlFlow::Return(code) => {
            BuiltinResult::Result(RunResult::error(code, String::new()))
        }
        ControlFlow::Exit(code) => BuiltinResult::Exit(code),
    })
}

// -- return / exit ---------------------------------------------------------

/// Parse a status argument; `None` means it was not numeric.
fn status_arg(state: &ShellState, args: &[String]) -> Option<i32> {
    match args.first() {
        None => Some(state.last_exit_code),
        Some(arg) => arg.parse::<i64>().ok().map(|n| (n & 0xff) as i32),
    }
}

fn builtin_return(state: &ShellState, args: &[String]) -> BuiltinResult {
    if state.function_depth == 0 && state.source_depth == 0 {
        return BuiltinResult::Result(RunResult::error(
            1,
            "return: can only `return' from a function or sourced script\n".into(),
        ));
    }
    match status_arg(state, args) {
        Some(code) => BuiltinResult::Return(code),
        None => BuiltinResult::Result(RunResult::error(
            2,
            format!("return: {}: numeric argument required\n", args[0]),
        )),
    }
}

fn builtin_exit(state: &mut ShellState, args: &[String]) -> BuiltinResult {
    match status_arg(state, args) {
        Some(code) => BuiltinResult::Exit(code),
        None => {
            state.write_err(&format!("exit: {}: numeric argument required\n", args[0]));
            BuiltinResult::Exit(2)
        }
    }
}
