//! Per-record pipeline.
//!
//! Turns one [`Record`] into one [`RecordOutput`]:
//!
//! 1. alphabet normalization and strand split,
//! 2. constraint application,
//! 3. minimum free energy structure,
//! 4. partition function and pairing propensity (optional),
//! 5. centroid and MEA structures (optional),
//! 6. dimer free energies and equilibrium concentrations (optional),
//! 7. formatting.
//!
//! A sequence with characters outside the nucleotide alphabet is skipped with a
//! warning. Other recoverable problems also become warnings in the output's
//! diagnostic payload. Fatal
//! problems are returned as a [`RecordFailure`] that still carries the diagnostics
//! gathered so far, so the record's slot in the ordered output can be filled before
//! the run stops.

use log::debug;

use crate::concentration::{self, DimerEnergies};
use crate::config::{OutputFormat, RunConfig};
use crate::constraints::{HardConstraints, extract_inline_constraint};
use crate::errors::{MultifoldError, Result};
use crate::fold::{FoldCompound, FoldEngine, ModelSettings};
use crate::output::{RecordOutput, format_general};
use crate::record::Record;
use crate::sequence::{
    find_invalid_base, insert_cut_point, is_homodimer, normalize, remove_cut_point, strands,
};

/// A record whose processing hit a run-aborting error.
#[derive(Debug)]
pub struct RecordFailure {
    /// Diagnostics of the record, including the error message; no data.
    pub output: RecordOutput,
    /// The error.
    pub error: MultifoldError,
}

/// Outcome of processing one record.
pub type RecordResult = std::result::Result<RecordOutput, RecordFailure>;

/// Runs the full pipeline for one record.
///
/// The fold compound is acquired here and dropped before returning.
pub fn process_record<E: FoldEngine>(
    engine: &E,
    config: &RunConfig,
    record: &Record,
) -> RecordResult {
    let mut output = RecordOutput::new(record.number);
    if let Some((position, base)) = find_invalid_base(&record.sequence) {
        output.warn(&format!(
            "Skipping record {}: invalid character '{base}' at position {position}",
            record.id.as_deref().unwrap_or("without identifier")
        ));
        return Ok(output);
    }
    match fold_record(engine, config, record, &mut output) {
        Ok(()) => Ok(output),
        Err(error) => {
            output.data.clear();
            output.error(&error.to_string());
            Err(RecordFailure { output, error })
        }
    }
}

/// Output produced for a record the reader could not interpret.
#[must_use]
pub fn malformed_output(number: u64, line: usize, reason: &str) -> RecordOutput {
    let mut output = RecordOutput::new(number);
    output.warn(&format!("Skipping malformed record at line {line}: {reason}"));
    output
}

fn fold_record<E: FoldEngine>(
    engine: &E,
    config: &RunConfig,
    record: &Record,
    output: &mut RecordOutput,
) -> Result<()> {
    let display = normalize(&record.sequence, config.dna_to_rna);
    let (plain, split) = remove_cut_point(&display, record.number)?;
    if is_homodimer(&plain, split) {
        output.warn(
            "Both input strands are identical, inducing rotational symmetry; \
             a symmetry correction may be required for the actual MFE",
        );
    }

    let constraints = build_constraints(config, record, plain.len(), split, output)?;
    let mut compound = engine.compound(&plain, split, &config.model);
    compound.set_constraints(constraints);

    let Some((mfe_structure, mfe)) = compound.mfe() else {
        return Err(MultifoldError::EmptySolutionSet { sequence: display });
    };

    let mut row = TabularRow::new(config);
    match &config.output {
        OutputFormat::Structured => {
            if let Some(id) = &record.id {
                output.push_line(&format!(">{id}"));
            }
            output.push_line(&display);
            output.push_line(&format!("{} ({mfe:6.2})", insert_cut_point(&mfe_structure, split)));
        }
        OutputFormat::Tabular { .. } => {
            row.push(record.id_number.to_string());
            row.push(record.id.clone().unwrap_or_default());
            row.push(format!("\"{display}\""));
            row.push(format!("\"{}\"", insert_cut_point(&mfe_structure, split)));
            row.push(format!("{mfe:6.2}"));
        }
    }

    let mut ensemble_energy = None;
    if config.partition.enabled {
        let Some(ensemble) = compound.partition_function(mfe, config.partition.compute_bpp) else {
            return Err(MultifoldError::EmptySolutionSet { sequence: display });
        };
        ensemble_energy = Some(ensemble.energy);

        match &ensemble.probabilities {
            Some(bpp) => {
                let propensity = insert_cut_point(&bpp.propensity(), split);
                debug!(
                    "Record {}: {} base pairs with probability >= {}",
                    record.number,
                    bpp.pairs_above(config.partition.bpp_threshold).len(),
                    config.partition.bpp_threshold
                );
                if row.enabled() {
                    row.push(format!("\"{propensity}\""));
                    row.push(format!("{:6.2}", ensemble.energy));
                } else {
                    output.push_line(&format!("{propensity} [{:6.2}]", ensemble.energy));
                }
            }
            None if row.enabled() => row.push(format!("{:6.2}", ensemble.energy)),
            None => output.push_line(&format!(
                " free energy of connected ensemble = {} kcal/mol",
                format_general(ensemble.energy)
            )),
        }

        if let (Some(bpp), false) = (&ensemble.probabilities, row.enabled()) {
            if config.partition.centroid {
                let (centroid, distance) = bpp.centroid();
                let energy = compound.eval_structure(&centroid);
                output.push_line(&format!(
                    "{} {{{energy:6.2} d={distance:.2}}}",
                    insert_cut_point(&centroid, split)
                ));
            }
            if let Some(gamma) = config.partition.mea_gamma {
                let (mea_structure, accuracy) = bpp.mea(gamma);
                let energy = compound.eval_structure(&mea_structure);
                output.push_line(&format!(
                    "{} {{{energy:6.2} MEA={accuracy:.2}}}",
                    insert_cut_point(&mea_structure, split)
                ));
            }
        }
    }
    // Release the main compound's matrices before folding the dimer species.
    let kt = compound.kt();
    drop(compound);

    if config.dimer_energies {
        match (split, ensemble_energy) {
            (Some(split), Some(ab)) if split > 0 && split < plain.len() => {
                let energies = dimer_energies(engine, &config.model, &plain, split, ab, &display)?;
                if row.enabled() {
                    for value in [energies.ab, energies.aa, energies.bb, energies.a, energies.b] {
                        row.push(format!("{value:.6}"));
                    }
                } else {
                    output.data.push_str(&energies.format_block());
                    if let Some(rows) = &config.concentrations {
                        let results = concentration::solve(&energies, kt, rows)?;
                        for (index, result) in results.iter().enumerate() {
                            if !result.converged {
                                output.warn(&format!(
                                    "Equilibrium concentrations did not converge for row {}",
                                    index + 1
                                ));
                            }
                        }
                        output.data.push_str(&concentration::format_table(&results));
                    }
                }
            }
            _ => {
                output.warn("Dimer free energies need a sequence of two strands joined by '&'");
                if row.enabled() {
                    for _ in 0..5 {
                        row.push(String::new());
                    }
                }
            }
        }
    }

    if let Some(line) = row.finish() {
        output.push_line(&line);
    }
    Ok(())
}

/// Collects the hard constraints of a record from the configured sources.
fn build_constraints(
    config: &RunConfig,
    record: &Record,
    len: usize,
    split: Option<usize>,
    output: &mut RecordOutput,
) -> Result<HardConstraints> {
    let settings = &config.constraints;
    let mut constraints = HardConstraints::unconstrained(len);
    if let Some(commands) = &settings.file_commands {
        constraints.apply_commands(commands)?;
    } else if settings.inline {
        let inline =
            extract_inline_constraint(&record.rest, record.multiline, len, split, record.number)?;
        for warning in &inline.warnings {
            output.warn(warning);
        }
        if let Some(structure) = inline.structure {
            constraints.apply_dot_bracket(&structure, settings.enforce)?;
        }
    }
    constraints.apply_commands(&settings.commands)?;
    Ok(constraints)
}

/// Ensemble free energies of the monomers and of both homodimers.
fn dimer_energies<E: FoldEngine>(
    engine: &E,
    model: &ModelSettings,
    plain: &str,
    split: usize,
    ab: f64,
    display: &str,
) -> Result<DimerEnergies> {
    let (a, b) = strands(plain, split);
    let energy = |sequence: &str, split: Option<usize>| -> Result<f64> {
        let mut compound = engine.compound(sequence, split, model);
        compound
            .mfe()
            .and_then(|(_, mfe)| compound.partition_function(mfe, false))
            .map(|ensemble| ensemble.energy)
            .ok_or_else(|| MultifoldError::EmptySolutionSet { sequence: display.to_string() })
    };
    Ok(DimerEnergies {
        ab,
        aa: energy(&format!("{a}{a}"), Some(a.len()))?,
        bb: energy(&format!("{b}{b}"), Some(b.len()))?,
        a: energy(a, None)?,
        b: energy(b, None)?,
    })
}

/// Fields of one tabular output row.
struct TabularRow {
    delimiter: Option<char>,
    fields: Vec<String>,
}

impl TabularRow {
    fn new(config: &RunConfig) -> Self {
        let delimiter = match config.output {
            OutputFormat::Tabular { delimiter, .. } => Some(delimiter),
            OutputFormat::Structured => None,
        };
        Self { delimiter, fields: Vec::new() }
    }

    fn enabled(&self) -> bool {
        self.delimiter.is_some()
    }

    fn push(&mut self, field: String) {
        self.fields.push(field);
    }

    fn finish(self) -> Option<String> {
        self.delimiter.map(|delimiter| self.fields.join(&delimiter.to_string()))
    }
}
