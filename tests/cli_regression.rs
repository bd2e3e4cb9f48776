// Regression tests for the CLI surface: instrumented output on stdout,
// miette diagnostics on stderr, nonzero exits on failure.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

#[test]
fn instrument_prints_instrumented_source() {
    let file = "tests/cli_instrument_input.js";
    fs::write(file, "let a = 2;\n").unwrap();

    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("instrument").arg(file);
    cmd.assert()
        .success()
        .stdout(contains("let a = 2;").and(contains("let a_shadow = Symbol(")));

    let _ = fs::remove_file(file);
}

#[test]
fn instrument_reads_stdin_with_dash() {
    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("instrument").arg("-").write_stdin("let b = 1;\n");
    cmd.assert()
        .success()
        .stdout(contains("let b_shadow = Symbol("));
}

#[test]
fn instrument_emits_position_map_on_request() {
    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("instrument")
        .arg("-")
        .arg("--map")
        .write_stdin("let a = 1;\n");
    cmd.assert()
        .success()
        .stderr(contains("\"generated\"").and(contains("\"original\"")));
}

#[test]
fn cli_reports_miette_diagnostics_on_parse_error() {
    let file = "tests/cli_bad_input.js";
    fs::write(file, "let = ;\n").unwrap();

    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("instrument").arg(file);
    cmd.assert()
        .failure()
        .stderr(contains("umbra::parse").or(contains("Parse error")));

    let _ = fs::remove_file(file);
}

#[test]
fn diff_shows_added_companion_lines() {
    let file = "tests/cli_diff_input.js";
    fs::write(file, "let a = 2;\n").unwrap();

    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("diff").arg(file);
    cmd.assert()
        .success()
        .stdout(contains("+ let a_shadow = Symbol("));

    let _ = fs::remove_file(file);
}

#[test]
fn ast_dumps_json() {
    let file = "tests/cli_ast_input.js";
    fs::write(file, "let a = 2;\n").unwrap();

    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("ast").arg(file);
    cmd.assert()
        .success()
        .stdout(contains("\"VarDecl\"").and(contains("\"body\"")));

    let _ = fs::remove_file(file);
}

#[test]
fn batch_instruments_a_directory() {
    let dir = "tests/cli_batch_dir";
    let _ = fs::remove_dir_all(dir);
    fs::create_dir_all(dir).unwrap();
    fs::write(format!("{dir}/one.js"), "let a = 1;\n").unwrap();
    fs::write(format!("{dir}/two.js"), "let b = 2;\n").unwrap();
    fs::write(format!("{dir}/skip.txt"), "not source\n").unwrap();

    let mut cmd = Command::cargo_bin("umbra").unwrap();
    cmd.arg("batch").arg(dir);
    cmd.assert()
        .success()
        .stdout(contains("2 file(s) instrumented, 0 failed"));

    let one = fs::read_to_string(format!("{dir}/one.umbra.js")).unwrap();
    assert!(one.contains("a_shadow"));
    assert!(!std::path::Path::new(&format!("{dir}/skip.umbra.txt")).exists());

    let _ = fs::remove_dir_all(dir);
}
