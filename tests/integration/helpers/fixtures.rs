//! Input fixtures and run shortcuts.

use std::fs;
use std::path::{Path, PathBuf};

use multifold_lib::config::RunConfig;
use multifold_lib::dispatch::{BatchReport, InputSource, run_batch};
use multifold_lib::fold::FoldEngine;
use multifold_lib::output::MemorySink;

/// The sequence of the `index`-th generated hairpin: distinct, foldable, all
/// without `T` so it is unchanged by normalization.
pub fn hairpin(index: usize) -> String {
    let stem = 3 + index % 5;
    let loop_len = 3 + index / 5 % 4;
    format!("{}{}{}", "G".repeat(stem), "A".repeat(loop_len), "C".repeat(stem))
}

/// FASTA text of `n` generated hairpins named `r0`, `r1`, ...
pub fn hairpin_fasta(n: usize) -> String {
    (0..n).map(|i| format!(">r{i}\n{}\n", hairpin(i))).collect()
}

/// In-memory input source.
pub fn text_input(name: &str, content: &str) -> InputSource {
    InputSource::Text { name: name.to_string(), content: content.to_string() }
}

/// Writes `content` to `name` inside `dir` and returns the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    path
}

/// Runs a batch into an in-memory sink.
pub fn run_in_memory<E: FoldEngine>(
    engine: &E,
    config: &RunConfig,
    inputs: &[InputSource],
) -> BatchReport<MemorySink> {
    run_batch(engine, config, inputs, MemorySink::new())
}

/// A resolved configuration with `jobs` workers.
pub fn config_with_jobs(jobs: usize) -> RunConfig {
    RunConfig { jobs, ..RunConfig::default() }.resolve().expect("Invalid configuration")
}
