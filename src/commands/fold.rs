//! Fold sequence records and write their structures in input order.
//!
//! Records are read from one or more files (or standard input), folded by a pool of
//! workers and written to standard output; warnings and errors of a record are
//! written to standard error right before its data.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use std::io;
use std::path::PathBuf;

use multifold_lib::concentration::{
    InitialConcentration, parse_concentrations, read_concentration_file,
};
use multifold_lib::config::{
    ConstraintSettings, DEFAULT_BPP_THRESHOLD, OutputFormat, PartitionSettings, RunConfig,
};
use multifold_lib::constraints::read_command_file;
use multifold_lib::dispatch::{InputSource, run_batch};
use multifold_lib::fold::PairEnergyEngine;
use multifold_lib::logging::{OperationTimer, log_run_summary};
use multifold_lib::output::StreamSink;
use multifold_lib::validation::{validate_delimiter, validate_file_exists, validate_non_negative};

use crate::commands::command::Command;
use crate::commands::common::{IdOptions, InputOptions, ModelOptions, ThreadingOptions};

/// Fold RNA sequences and dimers.
#[derive(Debug, Parser)]
#[command(
    name = "fold",
    about = "\x1b[38;5;72m[FOLDING]\x1b[0m        \x1b[36mFold sequences and dimers in input order\x1b[0m",
    long_about = r#"
Predict secondary structures of single strands and of two strands joined by '&'.

Each record yields its minimum free energy structure and, optionally, the
partition function with base pair propensities, the centroid and MEA structures,
the free energies of the dimer species AB, AA, BB, A and B, and equilibrium
concentrations for a table of initial concentrations.

Records may be folded in parallel (--jobs); results are still written in input
order unless --unordered is given.

Example usage:
  multifold fold sequences.fa
  multifold fold -p --centroid --mea=2.0 -j 8 sequences.fa
  multifold fold -a --concfile concentrations.txt dimers.fa
  multifold fold -c dimers.fa < concentrations.txt
  multifold fold -C --enforce-constraint constrained.fa
  multifold fold --output-format D --csv-delim ';' sequences.fa > table.csv
"#
)]
pub struct Fold {
    /// Input options
    #[command(flatten)]
    pub input: InputOptions,

    /// Compute the partition function and base pair propensities
    #[arg(short = 'p', long = "partfunc", default_value = "false")]
    pub partfunc: bool,

    /// Compute the partition function without base pair probabilities
    #[arg(long = "no-bpp", default_value = "false")]
    pub no_bpp: bool,

    /// Only report base pairs at least this probable
    #[arg(long = "bppm-threshold", default_value_t = DEFAULT_BPP_THRESHOLD)]
    pub bppm_threshold: f64,

    /// Compute the centroid structure (implies -p)
    #[arg(long = "centroid", default_value = "false")]
    pub centroid: bool,

    /// Compute the maximum expected accuracy structure with this gamma (implies -p)
    #[arg(
        long = "mea",
        value_name = "GAMMA",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1.0"
    )]
    pub mea: Option<f64>,

    /// Compute the free energies of AB, AA, BB, A and B (implies -p)
    #[arg(short = 'a', long = "all-pf", default_value = "false")]
    pub all_pf: bool,

    /// File with initial concentrations of A and B, one pair per line (implies -a)
    #[arg(long = "concfile")]
    pub concfile: Option<PathBuf>,

    /// Read initial concentrations of A and B from standard input (implies -a).
    ///
    /// Sequences must then be given as files.
    #[arg(
        short = 'c',
        long = "concentrations",
        default_value = "false",
        conflicts_with = "concfile"
    )]
    pub concentrations: bool,

    /// Read a structure constraint from the line(s) following each sequence
    #[arg(short = 'C', long = "constraint", default_value = "false")]
    pub constraint: bool,

    /// File with constraint commands for the first record (all records with --batch)
    #[arg(long = "constraint-file")]
    pub constraint_file: Option<PathBuf>,

    /// Apply the constraint file to every record
    #[arg(long = "batch", default_value = "false")]
    pub batch: bool,

    /// Enforce the base pairs of dot-bracket constraints
    #[arg(long = "enforce-constraint", default_value = "false")]
    pub enforce: bool,

    /// Only allow canonical base pairs in constraints
    #[arg(long = "canonical-bp-only", default_value = "false")]
    pub canonical_only: bool,

    /// File with constraint commands applied to every record
    #[arg(long = "commands")]
    pub commands: Option<PathBuf>,

    /// Output format: V (structured) or D (delimiter separated)
    #[arg(long = "output-format", default_value = "V")]
    pub output_format: String,

    /// Field delimiter of delimiter separated output
    #[arg(long = "csv-delim", default_value = ",")]
    pub csv_delim: String,

    /// Do not print a header line in delimiter separated output
    #[arg(long = "csv-noheader", default_value = "false")]
    pub csv_noheader: bool,

    /// Energy model options
    #[command(flatten)]
    pub model: ModelOptions,

    /// Identifier options
    #[command(flatten)]
    pub ids: IdOptions,

    /// Parallelism options
    #[command(flatten)]
    pub threading: ThreadingOptions,
}

impl Fold {
    /// Initial concentrations from `--concfile` or, with `-c`, from standard input.
    fn concentration_rows(&self) -> Result<Option<Vec<InitialConcentration>>> {
        let (rows, source) = if let Some(path) = &self.concfile {
            validate_file_exists(path, "Concentration")?;
            (read_concentration_file(path)?, path.display().to_string())
        } else if self.concentrations {
            if self.input.sources().contains(&InputSource::Stdin) {
                bail!("-c/--concentrations reads standard input; give the sequences as files");
            }
            (parse_concentrations(io::stdin().lock(), "<stdin>")?, "<stdin>".to_string())
        } else {
            return Ok(None);
        };
        if rows.is_empty() {
            bail!("No initial concentrations in {source}");
        }
        info!("Read {} concentration row(s) from {source}", rows.len());
        Ok(Some(rows))
    }

    /// Assembles the run configuration, reading auxiliary files.
    fn run_config(&self) -> Result<RunConfig> {
        if let Some(gamma) = self.mea {
            validate_non_negative(gamma, "mea")?;
        }
        let delimiter = validate_delimiter(&self.csv_delim, "csv-delim")?;
        let (output, format_warning) =
            OutputFormat::from_flag(&self.output_format, delimiter, !self.csv_noheader);
        if let Some(message) = format_warning {
            warn!("{message}");
        }

        let concentrations = self.concentration_rows()?;

        let file_commands = match &self.constraint_file {
            Some(path) => {
                validate_file_exists(path, "Constraint")?;
                Some(read_command_file(path)?)
            }
            None => None,
        };
        let commands = match &self.commands {
            Some(path) => {
                validate_file_exists(path, "Command")?;
                read_command_file(path)?
            }
            None => Vec::new(),
        };
        if self.batch && file_commands.is_none() {
            warn!("--batch has no effect without --constraint-file");
        }

        let config = RunConfig {
            model: self.model.settings(self.canonical_only),
            dna_to_rna: !self.model.no_convert,
            partition: PartitionSettings {
                enabled: self.partfunc || self.no_bpp,
                compute_bpp: !self.no_bpp,
                bpp_threshold: self.bppm_threshold,
                centroid: self.centroid,
                mea_gamma: self.mea,
            },
            dimer_energies: self.all_pf,
            concentrations,
            constraints: ConstraintSettings {
                inline: self.constraint,
                enforce: self.enforce,
                file_commands,
                batch: self.batch,
                commands,
            },
            output,
            ids: self.ids.settings(),
            jobs: self.threading.jobs,
            ordering: self.threading.ordering(),
        };
        Ok(config.resolve()?)
    }
}

impl Command for Fold {
    fn execute(&self, _command_line: &str) -> Result<()> {
        let config = self.run_config()?;
        let inputs = self.input.sources();

        info!("Starting Fold");
        info!("Inputs: {}", inputs.iter().map(|i| i.name()).collect::<Vec<_>>().join(", "));
        info!("Temperature: {} C", config.model.temperature);
        info!("Jobs: {} ({:?})", config.jobs, config.ordering);
        if config.partition.enabled {
            info!(
                "Partition function: enabled (base pair probabilities: {})",
                config.partition.compute_bpp
            );
        }
        if config.constraints.any() {
            info!("Structure constraints: enabled");
        }
        if let Some(limit) = config.record_limit() {
            info!("Constraint file without --batch: folding the first {limit} record(s) only");
        }

        let timer = OperationTimer::new("Folding records");
        let report = run_batch(&PairEnergyEngine::new(), &config, &inputs, StreamSink::stdio());
        log_run_summary(&report.summary);
        timer.log_completion(report.summary.records);

        match report.error {
            None => Ok(()),
            Some(error) if !error.is_fatal() => {
                Err(error).context("All readable records were folded")
            }
            Some(error) => {
                Err(error).context("Run aborted; results up to the failing record were written")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multifold_lib::queue::OrderingPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Fold {
        let mut argv = vec!["fold"];
        argv.extend_from_slice(args);
        Fold::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).run_config().unwrap();
        assert!(!config.partition.enabled);
        assert!(config.dna_to_rna);
        assert_eq!(config.jobs, 1);
        assert_eq!(config.ordering, OrderingPolicy::KeepOrder);
        assert_eq!(config.output, OutputFormat::Structured);
    }

    #[test]
    fn test_mea_without_value_uses_default_gamma() {
        let config = parse(&["--mea"]).run_config().unwrap();
        assert_eq!(config.partition.mea_gamma, Some(1.0));
        assert!(config.partition.enabled);

        let config = parse(&["--mea=2.5"]).run_config().unwrap();
        assert_eq!(config.partition.mea_gamma, Some(2.5));
    }

    #[test]
    fn test_no_bpp_enables_partition_function() {
        let config = parse(&["--no-bpp"]).run_config().unwrap();
        assert!(config.partition.enabled);
        assert!(!config.partition.compute_bpp);
    }

    #[test]
    fn test_tabular_output_and_threading() {
        let config = parse(&["--output-format", "D", "--csv-delim", ";", "-j", "3", "--unordered"])
            .run_config()
            .unwrap();
        assert_eq!(config.output, OutputFormat::Tabular { delimiter: ';', header: true });
        assert_eq!(config.jobs, 3);
        assert_eq!(config.ordering, OrderingPolicy::Unordered);
    }

    #[test]
    fn test_concentration_file_implies_dimer_energies() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1e-5 1e-5\n2e-5 1e-5\n0 0").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let config = parse(&["--concfile", &path]).run_config().unwrap();
        assert!(config.dimer_energies);
        assert_eq!(config.concentrations.map(|rows| rows.len()), Some(2));
    }

    #[test]
    fn test_concentrations_from_stdin_need_file_inputs() {
        let err = parse(&["-c"]).run_config().unwrap_err();
        assert!(err.to_string().contains("give the sequences as files"));
        let err = parse(&["-c", "-"]).run_config().unwrap_err();
        assert!(err.to_string().contains("give the sequences as files"));
        assert!(Fold::try_parse_from(["fold", "-c", "--concfile", "c.txt", "in.fa"]).is_err());
    }

    #[test]
    fn test_missing_constraint_file_is_an_error() {
        let result = parse(&["--constraint-file", "/nonexistent/constraints.txt"]).run_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_delimiter_is_an_error() {
        assert!(parse(&["--csv-delim", "ab"]).run_config().is_err());
    }

    #[test]
    fn test_negative_temperature() {
        let config = parse(&["-T", "-5"]).run_config().unwrap();
        assert!((config.model.temperature + 5.0).abs() < f64::EPSILON);
    }
}
