use wordsh_shell::ast::{AssignValue, Assignment, Command, ListOp, Word};
use wordsh_shell::parser::Parser;

use crate::builtins::{try_builtin, BuiltinResult};
use crate::control::{ControlFlow, RunResult, ShellError};
use crate::expand::{eval_assignment_word, eval_words};
use crate::host::HostInterface;
use crate::state::{ShellState, MAX_FUNCTION_DEPTH};

// ---------------------------------------------------------------------------
// Units of source
// ---------------------------------------------------------------------------

/// Run a complete program and collect its output.
///
/// A fatal error stops the program; output written by earlier commands is
/// kept and the error message is appended to stderr.
pub fn run_program(state: &mut ShellState, host: &dyn HostInterface, source: &str) -> RunResult {
    let exit_code = match run_source(state, host, source) {
        Ok(flow) => flow.status(),
        Err(err) => {
            tracing::debug!(%err, "unit aborted");
            state.write_err(&format!("wordsh: {err}\n"));
            err.exit_status()
        }
    };
    state.last_exit_code = exit_code;
    let (stdout, stderr) = state.drain_output();
    RunResult {
        exit_code,
        stdout,
        stderr,
    }
}

/// Parse and execute `source` one top-level command at a time.
///
/// The parser mode is refreshed from the option registry before every
/// command, so a `shopt` (or a sourced file that runs one) changes how the
/// rest of the unit is parsed. `return` and `exit` end the unit and are
/// passed to the caller.
pub fn run_source(
    state: &mut ShellState,
    host: &dyn HostInterface,
    source: &str,
) -> Result<ControlFlow, ShellError> {
    let mut parser = Parser::new(source, state.options.parser_mode());
    let mut status = 0;
    loop {
        parser.set_mode(state.options.parser_mode());
        let Some(cmd) = parser.next_command()? else {
            break;
        };
        match exec_command(state, host, &cmd)? {
            ControlFlow::Normal(code) => status = code,
            flow => return Ok(flow),
        }
    }
    Ok(ControlFlow::Normal(status))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn exec_command(
    state: &mut ShellState,
    host: &dyn HostInterface,
    cmd: &Command,
) -> Result<ControlFlow, ShellError> {
    let flow = match cmd {
        Command::Simple { assignments, words } => exec_simple(state, host, assignments, words)?,

        Command::List { left, op, right } => {
            let flow = exec_command(state, host, left)?;
            let ControlFlow::Normal(code) = flow else {
                return Ok(flow);
            };
            let run_right = match op {
                ListOp::And => code == 0,
                ListOp::Or => code != 0,
            };
            if run_right {
                exec_command(state, host, right)?
            } else {
                flow
            }
        }

        Command::FunctionDef { name, body } => {
            state.functions.insert(name.clone(), (**body).clone());
            ControlFlow::Normal(0)
        }

        Command::Group { body } => {
            let mut status = 0;
            for cmd in body {
                match exec_command(state, host, cmd)? {
                    ControlFlow::Normal(code) => status = code,
                    flow => return Ok(flow),
                }
            }
            ControlFlow::Normal(status)
        }
    };

    if let ControlFlow::Normal(code) = flow {
        state.last_exit_code = code;
    }
    Ok(flow)
}

fn exec_simple(
    state: &mut ShellState,
    host: &dyn HostInterface,
    assignments: &[Assignment],
    words: &[Word],
) -> Result<ControlFlow, ShellError> {
    // Every word is evaluated before anything runs.
    let argv = eval_words(words, &state.options, &*state, host)?;

    let Some((cmd_name, args)) = argv.split_first() else {
        // Assignment-only command (or every word elided).
        for assignment in assignments {
            assign(state, host, assignment)?;
        }
        return Ok(ControlFlow::Normal(0));
    };

    // Prefix assignments last for the duration of the command.
    let mut saved = Vec::with_capacity(assignments.len());
    let mut assigned = Ok(());
    for assignment in assignments {
        let name = &assignment.name;
        saved.push((
            name.clone(),
            state.env.get(name).cloned(),
            state.arrays.get(name).cloned(),
        ));
        assigned = assign(state, host, assignment);
        if assigned.is_err() {
            break;
        }
    }

    let result = match assigned {
        Ok(()) => dispatch(state, host, cmd_name, args),
        Err(err) => Err(err),
    };
    restore_vars(state, saved);
    result
}

type SavedVar = (String, Option<String>, Option<Vec<String>>);

fn restore_vars(state: &mut ShellState, saved: Vec<SavedVar>) {
    for (name, scalar, array) in saved.into_iter().rev() {
        state.unset_var(&name);
        if let Some(value) = scalar {
            state.env.insert(name.clone(), value);
        }
        if let Some(values) = array {
            state.arrays.insert(name, values);
        }
    }
}

fn assign(
    state: &mut ShellState,
    host: &dyn HostInterface,
    assignment: &Assignment,
) -> Result<(), ShellError> {
    match &assignment.value {
        AssignValue::Scalar(word) => {
            let value = eval_assignment_word(word, &*state);
            state.set_var(&assignment.name, value);
        }
        AssignValue::Array(elements) => {
            let values = eval_words(elements, &state.options, &*state, host)?;
            state.set_array(&assignment.name, values);
        }
    }
    Ok(())
}

/// Run a function, a builtin, or report an unknown command.
fn dispatch(
    state: &mut ShellState,
    host: &dyn HostInterface,
    cmd_name: &str,
    args: &[String],
) -> Result<ControlFlow, ShellError> {
    if let Some(body) = state.functions.get(cmd_name).cloned() {
        return call_function(state, host, &body, args);
    }

    let run = |state: &mut ShellState, source: &str| run_source(state, host, source);
    let Some(result) = try_builtin(state, host, cmd_name, args, Some(&run)) else {
        state.write_err(&format!("wordsh: {cmd_name}: command not found\n"));
        return Ok(ControlFlow::Normal(127));
    };

    Ok(match result? {
        BuiltinResult::Result(r) => {
            state.write_out(&r.stdout);
            state.write_err(&r.stderr);
            ControlFlow::Normal(r.exit_code)
        }
        BuiltinResult::Exit(code) => ControlFlow::Exit(code),
        BuiltinResult::Return(code) => ControlFlow::Return(code),
    })
}

fn call_function(
    state: &mut ShellState,
    host: &dyn HostInterface,
    body: &Command,
    args: &[String],
) -> Result<ControlFlow, ShellError> {
    if state.function_depth >= MAX_FUNCTION_DEPTH {
        return Err(ShellError::FunctionTooDeep);
    }
    let saved_positionals = std::mem::replace(&mut state.positional_args, args.to_vec());
    state.function_depth += 1;

    let result = exec_command(state, host, body);

    state.function_depth -= 1;
    state.positional_args = saved_positionals;

    Ok(match result? {
        ControlFlow::Return(code) => ControlFlow::Normal(code),
        other => other,
    })
}
