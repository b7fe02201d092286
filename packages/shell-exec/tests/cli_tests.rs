use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SCENARIO: &str = "spaces='a b'
glob=*.txt
empty=
prefix=sp
argv $spaces $glob $empty $prefix*.txt
";

/// A working directory holding foo.txt, bar.txt and spam.txt.
fn txt_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["foo.txt", "bar.txt", "spam.txt"] {
        fs::write(dir.path().join(name), "").unwrap();
    }
    dir
}

fn wordsh(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wordsh"));
    cmd.current_dir(dir.path()).env_remove("WORDSH_LOG");
    cmd
}

#[test]
fn test_legacy_word_evaluation() {
    let dir = txt_dir();
    wordsh(&dir)
        .arg("-c")
        .arg(SCENARIO)
        .assert()
        .success()
        .stdout(predicate::eq(
            "['a', 'b', 'bar.txt', 'foo.txt', 'spam.txt', 'spam.txt']\n",
        ));
}

#[test]
fn test_static_word_evaluation_from_startup_flag() {
    let dir = txt_dir();
    wordsh(&dir)
        .args(["-O", "static-word-eval", "-c", SCENARIO])
        .assert()
        .success()
        .stdout(predicate::eq("['a b', '*.txt', '', 'spam.txt']\n"));
}

#[test]
fn test_plus_o_disables_startup_option() {
    let dir = txt_dir();
    wordsh(&dir)
        .args(["-O", "static-word-eval", "+O", "static-word-eval", "-c", SCENARIO])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("['a', 'b',"));
}

#[test]
fn test_splice_needs_parse_at() {
    let dir = txt_dir();
    let script = "words=(a 'b c')\nargv @words\n";
    wordsh(&dir)
        .args(["-c", script])
        .assert()
        .success()
        .stdout(predicate::eq("['@words']\n"));
    wordsh(&dir)
        .args(["-O", "oil-parse-at", "-c", script])
        .assert()
        .success()
        .stdout(predicate::eq("['a', 'b c']\n"));
}

#[test]
fn test_splice_glob_suffix() {
    let dir = txt_dir();
    let script = "argv \"$@\"*.txt";
    wordsh(&dir)
        .args(["-c", script, "f"])
        .assert()
        .success()
        .stdout(predicate::eq("['foo.txt']\n"));
    wordsh(&dir)
        .args(["-O", "strict-array", "-c", script, "f"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("strict-array"));
}

#[test]
fn test_sourced_parse_at_persists() {
    let dir = txt_dir();
    fs::write(dir.path().join("enable.sh"), "shopt -s oil-parse-at\n").unwrap();
    fs::write(
        dir.path().join("main.sh"),
        "words=(a 'b c')\nargv @words\nsource enable.sh\nargv @words\n",
    )
    .unwrap();
    wordsh(&dir)
        .arg("main.sh")
        .assert()
        .success()
        .stdout(predicate::eq("['@words']\n['a', 'b c']\n"));
}

#[test]
fn test_parse_at_inside_function_fails() {
    let dir = txt_dir();
    wordsh(&dir)
        .args(["-c", "f() { shopt -s oil-parse-at; echo hi; }\nf\necho after"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unknown_option_in_shopt() {
    let dir = txt_dir();
    wordsh(&dir)
        .args(["-c", "shopt -s bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bogus: invalid shell option name"));
}

#[test]
fn test_unknown_startup_option() {
    let dir = txt_dir();
    wordsh(&dir)
        .args(["-O", "bogus", "-c", "echo never"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_script_from_stdin() {
    let dir = txt_dir();
    wordsh(&dir)
        .write_stdin("argv *.txt\n")
        .assert()
        .success()
        .stdout(predicate::eq("['bar.txt', 'foo.txt', 'spam.txt']\n"));
}

#[test]
fn test_script_arguments() {
    let dir = txt_dir();
    fs::write(dir.path().join("args.sh"), "argv \"$0\" \"$@\"\n").unwrap();
    wordsh(&dir)
        .args(["args.sh", "x y", "z"])
        .assert()
        .success()
        .stdout(predicate::eq("['args.sh', 'x y', 'z']\n"));
}

#[test]
fn test_missing_script() {
    let dir = txt_dir();
    wordsh(&dir)
        .arg("nope.sh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read script"));
}

#[test]
fn test_json_output() {
    let dir = txt_dir();
    let output = wordsh(&dir)
        .args(["--json", "-c", "echo hi; false"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["exit_code"], 1);
    assert_eq!(result["stdout"], "hi\n");
}

#[test]
fn test_parse_error_status() {
    let dir = txt_dir();
    wordsh(&dir)
        .args(["-c", "echo 'unterminated"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("parse error"));
}
