//! Run configuration.
//!
//! A [`RunConfig`] is assembled once from command-line options, resolved with
//! [`RunConfig::resolve`] (defaults, implied options, validation) and then shared
//! read-only by every worker.

use log::warn;

use crate::concentration::InitialConcentration;
use crate::constraints::ConstraintCommand;
use crate::errors::{MultifoldError, Result};
use crate::fold::ModelSettings;
use crate::queue::OrderingPolicy;
use crate::record::IdSettings;

/// Default probability threshold for reported base pairs.
pub const DEFAULT_BPP_THRESHOLD: f64 = 1e-5;

/// Default weight of base pairs in the MEA objective.
pub const DEFAULT_MEA_GAMMA: f64 = 1.0;

/// Output layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// FASTA-like blocks with one line per result.
    #[default]
    Structured,
    /// One delimiter-separated row per record.
    Tabular {
        /// Field delimiter.
        delimiter: char,
        /// Whether to print a header line before the first row.
        header: bool,
    },
}

impl OutputFormat {
    /// Interprets an output format flag: `D`/`d` selects tabular output, `V`/`v`
    /// structured output.
    ///
    /// Unknown flags fall back to structured output; the returned warning says so.
    #[must_use]
    pub fn from_flag(flag: &str, delimiter: char, header: bool) -> (Self, Option<String>) {
        match flag.chars().next() {
            Some('D' | 'd') => (Self::Tabular { delimiter, header }, None),
            Some('V' | 'v') => (Self::Structured, None),
            _ => (
                Self::Structured,
                Some(format!("Output format '{flag}' not recognized, using default")),
            ),
        }
    }

    /// True for tabular output.
    #[must_use]
    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Tabular { .. })
    }
}

/// Partition function options.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSettings {
    /// Compute the partition function.
    pub enabled: bool,
    /// Compute base-pair probabilities.
    pub compute_bpp: bool,
    /// Only pairs at least this probable are reported.
    pub bpp_threshold: f64,
    /// Compute the centroid structure.
    pub centroid: bool,
    /// Compute the MEA structure with this gamma.
    pub mea_gamma: Option<f64>,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            compute_bpp: true,
            bpp_threshold: DEFAULT_BPP_THRESHOLD,
            centroid: false,
            mea_gamma: None,
        }
    }
}

/// Structure constraint options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSettings {
    /// Read a dot-bracket constraint from each record's ancillary lines.
    ///
    /// Ignored when a constraint file is given.
    pub inline: bool,
    /// Enforce constrained pairs rather than merely allowing them.
    pub enforce: bool,
    /// Commands from a constraint file, replacing inline constraints.
    pub file_commands: Option<Vec<ConstraintCommand>>,
    /// Apply the constraint file to every record instead of only the first.
    pub batch: bool,
    /// Commands applied to every record in addition to other constraints.
    pub commands: Vec<ConstraintCommand>,
}

impl ConstraintSettings {
    /// True if any constraint source is in effect.
    #[must_use]
    pub fn any(&self) -> bool {
        self.inline || self.file_commands.is_some() || !self.commands.is_empty()
    }
}

/// Immutable, process-wide configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Energy model parameters.
    pub model: ModelSettings,
    /// Substitute `T` by `U`.
    pub dna_to_rna: bool,
    /// Partition function options.
    pub partition: PartitionSettings,
    /// Compute free energies of AB, AA, BB, A and B.
    pub dimer_energies: bool,
    /// Initial concentrations for the equilibrium solver.
    pub concentrations: Option<Vec<InitialConcentration>>,
    /// Constraint options.
    pub constraints: ConstraintSettings,
    /// Output layout.
    pub output: OutputFormat,
    /// Identifier control.
    pub ids: IdSettings,
    /// Upper bound of concurrently processed records; 0 means all available cores.
    pub jobs: usize,
    /// Ordering policy of the output.
    pub ordering: OrderingPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            dna_to_rna: true,
            partition: PartitionSettings::default(),
            dimer_energies: false,
            concentrations: None,
            constraints: ConstraintSettings::default(),
            output: OutputFormat::Structured,
            ids: IdSettings::default(),
            jobs: 1,
            ordering: OrderingPolicy::KeepOrder,
        }
    }
}

impl RunConfig {
    /// Validates the configuration and applies implied options.
    ///
    /// - centroid or MEA structures require base-pair probabilities,
    /// - concentrations require dimer energies, which require the partition function,
    /// - `jobs == 0` selects the number of available cores.
    ///
    /// # Errors
    ///
    /// Returns [`MultifoldError::InvalidParameter`] for values outside their domain.
    pub fn resolve(mut self) -> Result<Self> {
        if !self.model.temperature.is_finite() || self.model.temperature < -273.15 {
            return Err(invalid("temperature", "must be above absolute zero"));
        }
        if self.model.max_bp_span == Some(0) {
            return Err(invalid("max-bp-span", "must be at least 1"));
        }
        if let Some(gamma) = self.partition.mea_gamma {
            if !gamma.is_finite() || gamma < 0.0 {
                return Err(invalid("mea", "gamma must be a non-negative number"));
            }
        }
        if self.partition.bpp_threshold.is_nan() {
            return Err(invalid("bppm-threshold", "must be a number"));
        }
        if !(0.0..=1.0).contains(&self.partition.bpp_threshold) {
            let clamped = self.partition.bpp_threshold.clamp(0.0, 1.0);
            warn!(
                "Base pair probability threshold {} outside [0, 1], using {clamped}",
                self.partition.bpp_threshold
            );
            self.partition.bpp_threshold = clamped;
        }
        if self.ids.digits == 0 || self.ids.digits > 18 {
            return Err(invalid("id-digits", "must be between 1 and 18"));
        }

        if self.partition.centroid || self.partition.mea_gamma.is_some() {
            self.partition.enabled = true;
            self.partition.compute_bpp = true;
        }
        if self.concentrations.is_some() {
            self.dimer_energies = true;
        }
        if self.dimer_energies {
            self.partition.enabled = true;
        }
        if self.concentrations.is_some() && self.output.is_tabular() {
            warn!("Equilibrium concentrations are only reported in structured output");
        }

        if self.jobs == 0 {
            self.jobs = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        }
        Ok(self)
    }

    /// Maximum number of records to process, if limited.
    ///
    /// A constraint file without batch mode applies to the first record only.
    #[must_use]
    pub fn record_limit(&self) -> Option<u64> {
        (self.constraints.file_commands.is_some() && !self.constraints.batch).then_some(1)
    }

    /// The header line of tabular output, if one should be printed.
    #[must_use]
    pub fn tabular_header(&self) -> Option<String> {
        let OutputFormat::Tabular { delimiter, header: true } = self.output else {
            return None;
        };
        let mut fields = vec!["seq_num", "seq_id", "seq", "mfe_struct", "mfe"];
        if self.partition.enabled {
            if self.partition.compute_bpp {
                fields.push("bpp_string");
            }
            fields.push("ensemble_energy");
        }
        if self.dimer_energies {
            fields.extend(["AB", "AA", "BB", "A", "B"]);
        }
        let mut line = fields.join(&delimiter.to_string());
        line.push('\n');
        Some(line)
    }
}

fn invalid(parameter: &str, reason: &str) -> MultifoldError {
    MultifoldError::InvalidParameter { parameter: parameter.to_string(), reason: reason.to_string() }
}
