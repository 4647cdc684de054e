//! Output order under parallel folding.

use multifold_lib::config::{OutputFormat, RunConfig};
use multifold_lib::fold::PairEnergyEngine;
use multifold_lib::queue::OrderingPolicy;

use crate::helpers::{
    DelayedEngine, config_with_jobs, hairpin, hairpin_fasta, run_in_memory, text_input,
};

#[test]
fn test_slow_record_does_not_reorder_output() {
    let engine = DelayedEngine::new().delay(&hairpin(2), 200);
    let input = [text_input("five", &hairpin_fasta(5))];

    let report = run_in_memory(&engine, &config_with_jobs(3), &input);
    assert!(report.error.is_none());
    assert_eq!(report.sink.order, vec![0, 1, 2, 3, 4]);

    let sequential = run_in_memory(&PairEnergyEngine::new(), &config_with_jobs(1), &input);
    assert_eq!(report.sink.data, sequential.sink.data);
}

#[test]
fn test_parallel_output_is_byte_identical() {
    let mut config = RunConfig::default();
    config.partition.centroid = true;
    config.partition.mea_gamma = Some(1.5);
    let sequential = config.clone().resolve().unwrap();
    let parallel = RunConfig { jobs: 4, ..config }.resolve().unwrap();

    // Warnings in the diagnostics stream: a homodimer and a missing ">" sequence.
    let mut content = hairpin_fasta(12);
    content.push_str(">dimer\nGGGA&GGGA\n>empty\n");
    let input = [text_input("mixed", &content)];

    let engine = PairEnergyEngine::new();
    let one = run_in_memory(&engine, &sequential, &input);
    let four = run_in_memory(&engine, &parallel, &input);
    assert!(one.error.is_none());
    assert!(four.error.is_none());
    assert_eq!(one.sink, four.sink);
    assert_eq!(four.summary.records, 13);
    assert_eq!(four.summary.malformed, 1);
}

#[test]
fn test_peak_in_flight_is_bounded_by_jobs() {
    let mut engine = DelayedEngine::new();
    for i in 0..10 {
        engine = engine.delay(&hairpin(i), 20);
    }
    let report =
        run_in_memory(&engine, &config_with_jobs(2), &[text_input("ten", &hairpin_fasta(10))]);
    assert!(report.error.is_none());
    assert!(report.summary.peak_in_flight >= 1);
    assert!(report.summary.peak_in_flight <= 2);
    assert_eq!(report.sink.order, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_unordered_writes_fast_records_first() {
    let engine = DelayedEngine::new().delay(&hairpin(0), 300);
    let config = RunConfig { jobs: 2, ordering: OrderingPolicy::Unordered, ..RunConfig::default() }
        .resolve()
        .unwrap();
    let report = run_in_memory(&engine, &config, &[text_input("three", &hairpin_fasta(3))]);
    assert!(report.error.is_none());
    assert_eq!(report.sink.order.len(), 3);
    assert_ne!(report.sink.order[0], 0);
    assert_eq!(report.sink.order.last(), Some(&0));
}

#[test]
fn test_tabular_rows_follow_header_in_order() {
    let config = RunConfig {
        jobs: 3,
        output: OutputFormat::Tabular { delimiter: '\t', header: true },
        ..RunConfig::default()
    }
    .resolve()
    .unwrap();
    let engine = DelayedEngine::new().delay(&hairpin(0), 100);
    let report = run_in_memory(&engine, &config, &[text_input("six", &hairpin_fasta(6))]);

    let lines: Vec<_> = report.sink.data.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("seq_num\tseq_id"));
    for (i, line) in lines[1..].iter().enumerate() {
        assert!(line.starts_with(&format!("{}\tr{i}\t", i + 1)), "row {i}: {line}");
    }
}
