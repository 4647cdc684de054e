//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::{Path, PathBuf};

use clap::Args;

use multifold_lib::dispatch::InputSource;
use multifold_lib::fold::{DEFAULT_TEMPERATURE, ModelSettings};
use multifold_lib::queue::OrderingPolicy;
use multifold_lib::record::IdSettings;

/// Returns true if the path names standard input.
#[must_use]
pub fn is_stdin_path(path: &Path) -> bool {
    path.as_os_str() == "-" || path == Path::new("/dev/stdin")
}

/// Input options for commands reading sequence records.
#[derive(Debug, Clone, Default, Args)]
pub struct InputOptions {
    /// Input files; standard input is read if none (or `-`) is given
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,
}

impl InputOptions {
    /// The record sources in the order they are read.
    #[must_use]
    pub fn sources(&self) -> Vec<InputSource> {
        if self.inputs.is_empty() {
            return vec![InputSource::Stdin];
        }
        self.inputs
            .iter()
            .map(|path| {
                if is_stdin_path(path) { InputSource::Stdin } else { InputSource::File(path.clone()) }
            })
            .collect()
    }
}

/// Energy model options.
#[derive(Debug, Clone, Args)]
pub struct ModelOptions {
    /// Folding temperature in degrees Celsius
    #[arg(
        short = 'T',
        long = "temp",
        default_value_t = DEFAULT_TEMPERATURE,
        allow_negative_numbers = true
    )]
    pub temperature: f64,

    /// Maximum distance between the two nucleotides of a base pair
    #[arg(long = "max-bp-span")]
    pub max_bp_span: Option<usize>,

    /// Do not convert DNA (T) into RNA (U)
    #[arg(long = "noconv", default_value = "false")]
    pub no_convert: bool,
}

impl ModelOptions {
    /// Energy model settings.
    #[must_use]
    pub fn settings(&self, canonical_only: bool) -> ModelSettings {
        ModelSettings { temperature: self.temperature, max_bp_span: self.max_bp_span, canonical_only }
    }
}

/// Options for parallel processing.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Number of records folded in parallel.
    ///
    /// 1 folds every record on the main thread. 0 uses all available cores.
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    pub jobs: usize,

    /// Write results as soon as they are available instead of in input order
    #[arg(long = "unordered", default_value = "false")]
    pub unordered: bool,
}

impl ThreadingOptions {
    /// The ordering policy of the output.
    #[must_use]
    pub fn ordering(&self) -> OrderingPolicy {
        if self.unordered { OrderingPolicy::Unordered } else { OrderingPolicy::KeepOrder }
    }
}

/// Options controlling record identifiers.
#[derive(Debug, Clone, Args)]
pub struct IdOptions {
    /// Generate identifiers for all records
    #[arg(long = "auto-id", default_value = "false")]
    pub auto_id: bool,

    /// Prefix of generated identifiers
    #[arg(long = "id-prefix", default_value = "sequence")]
    pub prefix: String,

    /// Delimiter between prefix and number of generated identifiers
    #[arg(long = "id-delim", default_value = "_")]
    pub delimiter: String,

    /// Number of digits of generated identifiers (zero padded)
    #[arg(long = "id-digits", default_value_t = 4)]
    pub digits: usize,

    /// First identifier number
    #[arg(long = "id-start", default_value_t = 1)]
    pub start: u64,
}

impl IdOptions {
    /// Identifier control settings.
    #[must_use]
    pub fn settings(&self) -> IdSettings {
        IdSettings {
            auto_id: self.auto_id,
            prefix: self.prefix.clone(),
            delimiter: self.delimiter.clone(),
            digits: self.digits,
            start: self.start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("-", true)]
    #[case("/dev/stdin", true)]
    #[case("input.fa", false)]
    fn test_is_stdin_path(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_stdin_path(Path::new(path)), expected);
    }

    #[test]
    fn test_sources_default_to_stdin() {
        assert_eq!(InputOptions::default().sources(), vec![InputSource::Stdin]);

        let options =
            InputOptions { inputs: vec![PathBuf::from("a.fa"), PathBuf::from("-")] };
        assert_eq!(
            options.sources(),
            vec![InputSource::File(PathBuf::from("a.fa")), InputSource::Stdin]
        );
    }

    #[test]
    fn test_ordering() {
        let options = ThreadingOptions { jobs: 2, unordered: true };
        assert_eq!(options.ordering(), OrderingPolicy::Unordered);
    }
}
