//! Run-aborting errors, skipped inputs and malformed records.

use multifold_lib::config::{OutputFormat, RunConfig};
use multifold_lib::constraints::read_command_file;
use multifold_lib::dispatch::InputSource;
use multifold_lib::errors::MultifoldError;
use multifold_lib::fold::PairEnergyEngine;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{
    DelayedEngine, config_with_jobs, hairpin, hairpin_fasta, run_in_memory, text_input, write_file,
};

fn constrained(jobs: usize) -> RunConfig {
    let mut config = RunConfig { jobs, ..RunConfig::default() };
    config.constraints.inline = true;
    config.resolve().unwrap()
}

/// Five records, the third with a strand separator at a different position in
/// its constraint.
fn mismatch_input() -> String {
    let mut content = String::new();
    for i in 0..5 {
        if i == 2 {
            content.push_str(">bad\nGGG&AAACCC\n((((&..)))\n");
        } else {
            content.push_str(&format!(">r{i}\n{}\n", hairpin(i)));
        }
    }
    content
}

#[test]
fn test_fatal_error_stops_sequential_run() {
    let report = run_in_memory(
        &PairEnergyEngine::new(),
        &constrained(1),
        &[text_input("mismatch", &mismatch_input())],
    );
    assert!(matches!(report.error, Some(MultifoldError::CutPointMismatch { .. })));
    assert_eq!(report.sink.order, vec![0, 1, 2]);
    assert_eq!(report.summary.records, 3);
    assert!(report.sink.data.contains(">r1\n"));
    assert!(!report.sink.data.contains(">bad"));
    assert!(!report.sink.data.contains(">r3"));
    assert!(
        report.sink.diagnostics.contains("ERROR: Sequence and structure have different cut points")
    );
}

#[test]
fn test_fatal_error_drains_in_flight_records() {
    let mut content = String::from(">r0\nGCGCAAAAGCGC\n>bad\nGGG&AAACCC\n((((&..)))\n");
    let mut engine = DelayedEngine::new().delay("GCGCAAAAGCGC", 200);
    for i in 0..30 {
        content.push_str(&format!(">late{i}\n{}\n", hairpin(i % 20)));
        engine = engine.delay(&hairpin(i % 20), 50);
    }

    let report = run_in_memory(&engine, &constrained(3), &[text_input("mismatch", &content)]);
    assert!(matches!(report.error, Some(MultifoldError::CutPointMismatch { .. })));
    // The slow first record was in flight and still written, before the failure.
    assert!(report.sink.data.starts_with(">r0\nGCGCAAAAGCGC\n"));
    let order = &report.sink.order;
    assert_eq!(*order, (0..order.len() as u64).collect::<Vec<_>>());
    assert!(order.len() >= 2);
    assert!(report.summary.records < 32);
}

#[test]
fn test_command_out_of_range_aborts_before_output() {
    let dir = TempDir::new().unwrap();
    let commands = write_file(dir.path(), "commands.txt", "# force a helix\nF 1 50 2\n");
    let mut config = config_with_jobs(2);
    config.constraints.commands = read_command_file(&commands).unwrap();

    let report =
        run_in_memory(&PairEnergyEngine::new(), &config, &[text_input("ten", &hairpin_fasta(10))]);
    assert!(matches!(
        report.error,
        Some(MultifoldError::ConstraintOutOfRange { position: 50, .. })
    ));
    assert!(report.sink.data.is_empty());
    assert!(report.sink.diagnostics.contains("ERROR: "));
}

#[test]
fn test_empty_solution_set_is_fatal() {
    let input = text_input("blocked", ">r0\nGGGAAACCC\n>r1\nAAAAAAA\n|......\n");
    let report = run_in_memory(&PairEnergyEngine::new(), &constrained(1), &[input]);
    assert!(matches!(report.error, Some(MultifoldError::EmptySolutionSet { .. })));
    assert_eq!(report.sink.order, vec![0, 1]);
    assert!(report.sink.diagnostics.contains("empty solution set"));
}

#[test]
fn test_unreadable_input_is_skipped_and_numbering_continues() {
    let dir = TempDir::new().unwrap();
    let first = write_file(dir.path(), "first.fa", &hairpin_fasta(2));
    let second = write_file(dir.path(), "second.fa", ">third\nGGGGAAACCCC\n");
    let inputs = [
        InputSource::File(first),
        InputSource::File(dir.path().join("missing.fa")),
        InputSource::File(second),
    ];
    let config = RunConfig {
        output: OutputFormat::Tabular { delimiter: ',', header: false },
        ..config_with_jobs(2)
    };

    let report = run_in_memory(&PairEnergyEngine::new(), &config, &inputs);
    let Some(MultifoldError::SkippedInputs { paths }) = &report.error else {
        panic!("expected skipped inputs, got {:?}", report.error);
    };
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("missing.fa"));
    assert!(!report.error.as_ref().unwrap().is_fatal());

    assert_eq!(report.sink.order, vec![0, 1, 2]);
    let ids: Vec<_> = report.sink.data.lines().map(|l| l.split(',').next().unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn test_malformed_records_do_not_stop_the_run() {
    let content = ">lonely\n>r1\nGGGAAACCC\n((..))\n";
    let report = run_in_memory(
        &PairEnergyEngine::new(),
        &config_with_jobs(2),
        &[text_input("malformed", content)],
    );
    assert!(report.error.is_none());
    assert_eq!(report.sink.order, vec![0, 1]);
    assert_eq!(report.summary.malformed, 1);
    assert!(report.sink.diagnostics.contains("WARNING: Skipping malformed record at line 1"));
}

#[test]
fn test_records_handed_over_after_a_fatal_error_are_not_folded() {
    // `bad` fails after 100 ms while `slow` is still folding; `after` is already
    // read and waiting for a free worker at that point.
    let content = format!(
        ">bad\nAAAAAAA\n|......\n>slow\nGCGCAAAAGCGC\n>after\n{}\n>later\n{}\n",
        hairpin(1),
        hairpin(2)
    );
    let engine = DelayedEngine::new().delay("AAAAAAA", 100).delay("GCGCAAAAGCGC", 300);

    let report = run_in_memory(&engine, &constrained(2), &[text_input("abort", &content)]);
    assert!(matches!(report.error, Some(MultifoldError::EmptySolutionSet { .. })));
    assert!(report.sink.data.contains(">slow\n"));
    assert!(!report.sink.data.contains(">after"));
    assert!(!report.sink.data.contains(">later"));
    assert_eq!(report.summary.records, 2);
    let order = &report.sink.order;
    assert_eq!(*order, (0..order.len() as u64).collect::<Vec<_>>());
}

#[rstest]
#[case(1)]
#[case(2)]
fn test_panicking_record_aborts_the_run_in_order(#[case] jobs: usize) {
    let mut content = hairpin_fasta(2);
    content.push_str(">boom\nACGUACGU\n");
    for i in 0..10 {
        content.push_str(&format!(">late{i}\n{}\n", hairpin(i + 3)));
    }
    let engine = DelayedEngine::new().panic_on("ACGUACGU");

    let report = run_in_memory(&engine, &config_with_jobs(jobs), &[text_input("boom", &content)]);
    let Some(MultifoldError::RecordPanicked { number, message }) = &report.error else {
        panic!("expected a contained panic, got {:?}", report.error);
    };
    assert_eq!(*number, 2);
    assert!(message.contains("engine failure on ACGUACGU"));
    assert!(report.sink.data.starts_with(">r0\n"));
    assert!(report.sink.data.contains(">r1\n"));
    assert!(!report.sink.data.contains(">late9"));
    assert!(report.sink.diagnostics.contains("ERROR: Processing record 2 panicked"));
    let order = &report.sink.order;
    assert_eq!(*order, (0..order.len() as u64).collect::<Vec<_>>());
}

#[rstest]
#[case(1)]
#[case(2)]
fn test_non_ascii_dimer_does_not_lose_output(#[case] jobs: usize) {
    let mut content = String::from("GGGAAACCC\nA\u{c9}&CC\n");
    content.push_str(&"GGGGAAAACCCC\n".repeat(6));

    let report = run_in_memory(
        &PairEnergyEngine::new(),
        &config_with_jobs(jobs),
        &[text_input("accent", &content)],
    );
    assert!(report.error.is_none(), "{:?}", report.error);
    assert_eq!(report.sink.order, (0..8).collect::<Vec<_>>());
    assert_eq!(report.summary.flushed, 8);
    assert_eq!(report.sink.data.matches("GGGGAAAACCCC\n").count(), 6);
    assert!(report.sink.diagnostics.contains("invalid character"));
}
