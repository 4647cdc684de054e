//! Integration tests for the `fold` and `conc` commands.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

use crate::helpers::{hairpin_fasta, write_file};

fn multifold(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_multifold"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run multifold");
    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        pipe.write_all(stdin.unwrap_or_default().as_bytes()).expect("Failed to write stdin");
    }
    child.wait_with_output().expect("Failed to wait for multifold")
}

#[test]
fn test_fold_file() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "input.fa", ">hairpin\nGGGAAACCC\n");

    let output = multifold(&["fold", "-j", "2", input.to_str().unwrap()], None);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), ">hairpin\nGGGAAACCC\n(((...))) ( -9.00)\n");
}

#[test]
fn test_fold_stdin_matches_file_input() {
    let dir = TempDir::new().unwrap();
    let content = hairpin_fasta(8);
    let input = write_file(dir.path(), "input.fa", &content);

    let from_file = multifold(&["fold", "-p", input.to_str().unwrap()], None);
    let from_stdin = multifold(&["fold", "-p", "-j", "4"], Some(&content));
    assert!(from_file.status.success());
    assert!(from_stdin.status.success());
    assert_eq!(from_file.stdout, from_stdin.stdout);
}

#[test]
fn test_missing_input_fails_after_folding_the_rest() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "input.fa", ">kept\nGGGAAACCC\n");
    let missing = dir.path().join("missing.fa");

    let output =
        multifold(&["fold", missing.to_str().unwrap(), input.to_str().unwrap()], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(">kept"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.fa"));
}

#[test]
fn test_tabular_output_with_custom_delimiter() {
    let output = multifold(
        &["fold", "--output-format", "D", "--csv-delim", ";", "--auto-id", "--id-digits", "2"],
        Some("GGGAAACCC\nGGGGAAAACCCC\n"),
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines[0], "seq_num;seq_id;seq;mfe_struct;mfe");
    assert!(lines[1].starts_with("1;sequence_01;\"GGGAAACCC\";"));
    assert!(lines[2].starts_with("2;sequence_02;"));
}

#[test]
fn test_invalid_option_fails_before_reading() {
    let output = multifold(&["fold", "--constraint-file", "/nonexistent/constraints.txt"], None);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_fold_reads_concentrations_from_stdin() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "dimer.fa", ">d1\nGGGGAC&GUCCCC\n");

    let output = multifold(&["fold", "-c", input.to_str().unwrap()], Some("1e-5 1e-5\n0 0\n"));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(">d1\n"));
    assert!(stdout.contains("Free Energies:"));
    assert!(stdout.contains("Initial concentrations"));
}

#[test]
fn test_conc_command() {
    let output = multifold(
        &["conc", "--", "-20", "-20", "-20", "-8", "-8"],
        Some("1e-5 1e-5\n0 0\n"),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Free Energies:\n"));
    assert!(stdout.lines().last().unwrap().starts_with("1e-05"));
}
