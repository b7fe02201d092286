use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wordsh_shell_exec::executor::run_program;
use wordsh_shell_exec::host::LocalHost;
use wordsh_shell_exec::state::ShellState;

/// Run a shell program with configurable word evaluation.
#[derive(Parser, Debug)]
#[command(name = "wordsh", version)]
struct Cli {
    /// Enable a shell option before anything is parsed (repeatable).
    #[arg(short = 'O', value_name = "NAME")]
    set_option: Vec<String>,

    /// Disable a shell option before anything is parsed; also `+O NAME`.
    #[arg(long = "unset-option", value_name = "NAME")]
    unset_option: Vec<String>,

    /// Print the result as JSON instead of replaying its output.
    #[arg(long)]
    json: bool,

    /// Run COMMAND instead of a script.
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Script path (without -c) followed by its positional parameters.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    args: Vec<String>,
}

/// clap has no `+O` syntax; spell it as `--unset-option` up to the first
/// operand.
fn rewrite_plus_o(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut iter = args.into_iter();
    let mut out: Vec<String> = iter.next().into_iter().collect();
    let mut takes_value = false;
    let mut operands = false;

    for arg in iter {
        if operands || takes_value {
            takes_value = false;
            out.push(arg);
        } else if arg == "+O" {
            out.push("--unset-option".into());
            takes_value = true;
        } else if let Some(name) = arg.strip_prefix("+O") {
            out.push(format!("--unset-option={name}"));
        } else {
            takes_value = arg == "-O" || arg == "-c";
            operands = arg == "--" || !arg.starts_with('-');
            out.push(arg);
        }
    }
    out
}

/// `-O` / `+O` names in command-line order; `true` means enable.
fn startup_options(matches: &ArgMatches) -> Vec<(bool, String)> {
    let mut ops: Vec<(usize, bool, String)> = Vec::new();
    for (id, enable) in [("set_option", true), ("unset_option", false)] {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            ops.extend(indices.zip(values).map(|(i, v)| (i, enable, v.clone())));
        }
    }
    ops.sort_by_key(|(i, _, _)| *i);
    ops.into_iter().map(|(_, enable, name)| (enable, name)).collect()
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("WORDSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run() -> Result<i32> {
    let matches = Cli::command().get_matches_from(rewrite_plus_o(std::env::args()));
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let mut state = ShellState::new_default();
    for (enable, name) in startup_options(&matches) {
        let applied = if enable {
            state.options.set(&name)
        } else {
            state.options.unset(&name)
        };
        if let Err(err) = applied {
            eprintln!("wordsh: {err}");
            return Ok(1);
        }
    }

    let source = match cli.command {
        Some(command) => {
            state.positional_args = cli.args;
            command
        }
        None => match cli.args.split_first() {
            Some((path, rest)) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read script `{path}`"))?;
                state.script_name = path.clone();
                state.positional_args = rest.to_vec();
                source
            }
            None => {
                let mut source = String::new();
                io::stdin()
                    .read_to_string(&mut source)
                    .context("cannot read program from stdin")?;
                source
            }
        },
    };

    let host = LocalHost::current_dir()?;
    tracing::debug!(options = ?state.options.snapshot(), "starting");
    let result = run_program(&mut state, &host, &source);

    if cli.json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        io::stdout().write_all(result.stdout.as_bytes())?;
        io::stderr().write_all(result.stderr.as_bytes())?;
    }
    io::stdout().flush()?;
    Ok(result.exit_code)
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => ExitCode::from((code & 0xff) as u8),
        Err(err) => {
            eprintln!("wordsh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plus_o_becomes_long_flag() {
        assert_eq!(
            rewrite_plus_o(argv(&["wordsh", "+O", "a", "+Ob", "-O", "+O"])),
            argv(&["wordsh", "--unset-option", "a", "--unset-option=b", "-O", "+O"])
        );
    }

    #[test]
    fn plus_o_after_operands_is_left_alone() {
        assert_eq!(
            rewrite_plus_o(argv(&["wordsh", "script.sh", "+O", "x"])),
            argv(&["wordsh", "script.sh", "+O", "x"])
        );
        assert_eq!(
            rewrite_plus_o(argv(&["wordsh", "-c", "+O", "+O", "x"])),
            argv(&["wordsh", "-c", "+O", "--unset-option", "x"])
        );
    }

    #[test]
    fn startup_options_keep_command_line_order() {
        let matches = Cli::command().get_matches_from(rewrite_plus_o(argv(&[
            "wordsh",
            "-O",
            "strict-array",
            "+O",
            "strict-array",
            "-O",
            "static-word-eval",
        ])));
        assert_eq!(
            startup_options(&matches),
            vec![
                (true, "strict-array".to_string()),
                (false, "strict-array".to_string()),
                (true, "static-word-eval".to_string()),
            ]
        );
    }

    #[test]
    fn command_and_arguments() {
        let matches =
            Cli::command().get_matches_from(argv(&["wordsh", "--json", "-c", "argv \"$@\"", "a", "-b"]));
        let cli = Cli::from_arg_matches(&matches).unwrap();
        assert!(cli.json);
        assert_eq!(cli.command.as_deref(), Some("argv \"$@\""));
        assert_eq!(cli.args, argv(&["a", "-b"]));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
