use std::io::{self, Read, Write};
use std::process::ExitCode;

use wordsh_shell::parser::parse;
use wordsh_shell::serialize::serialize_program;
use wordsh_shell::ParserMode;

/// Reads a program on stdin and prints its AST as JSON.
///
/// `--parse-at` parses with `@name` splices enabled.
fn main() -> ExitCode {
    let parse_at = std::env::args().skip(1).any(|a| a == "--parse-at");

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("wordsh-parse: failed to read stdin: {e}");
        return ExitCode::FAILURE;
    }

    let cmds = match parse(&input, ParserMode::with_parse_at(parse_at)) {
        Ok(cmds) => cmds,
        Err(e) => {
            eprintln!("wordsh-parse: {e}");
            return ExitCode::from(2);
        }
    };

    let json = match serialize_program(&cmds) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("wordsh-parse: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = write_line(&mut io::stdout().lock(), &json) {
        eprintln!("wordsh-parse: failed to write output: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn write_line(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_line_appends_newline() {
        let mut out = Vec::new();
        write_line(&mut out, "[]").unwrap();
        assert_eq!(out, b"[]\n");
    }

    #[test]
    fn write_line_reports_broken_pipe() {
        let err = write_line(&mut ClosedPipe, "[]").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
