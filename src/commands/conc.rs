//! Equilibrium concentrations from known dimer free energies.
//!
//! Solves the dimerization equilibrium for a table of initial concentrations
//! without folding anything, e.g. to re-run the solver on energies reported by an
//! earlier `fold -a` run.

use anyhow::{Result, bail};
use clap::Parser;
use log::{info, warn};
use std::io::{self, Write};
use std::path::PathBuf;

use multifold_lib::concentration::{
    DimerEnergies, format_table, parse_concentrations, read_concentration_file, solve,
};
use multifold_lib::fold::{DEFAULT_TEMPERATURE, thermal_energy};
use multifold_lib::validation::validate_file_exists;

use crate::commands::command::Command;

/// Compute equilibrium concentrations of a dimerizing pair of strands.
#[derive(Debug, Parser)]
#[command(
    name = "conc",
    about = "\x1b[38;5;72m[FOLDING]\x1b[0m        \x1b[36mEquilibrium concentrations from dimer free energies\x1b[0m",
    long_about = r#"
Compute equilibrium concentrations of AB, AA, BB, A and B.

The five ensemble free energies (kcal/mol) are given on the command line in the
order AB AA BB A B. Initial concentrations of A and B are read from a file, one
whitespace separated pair per line, or from standard input. Reading stops at the
first line that does not hold two numbers or at a pair of zeros.

Example usage:
  multifold conc --concfile concentrations.txt -12.3 -8.1 -7.9 -2.0 -1.7
  printf '1e-5 1e-5\n0 0\n' | multifold conc -T 25 -12.3 -8.1 -7.9 -2.0 -1.7
"#
)]
pub struct Conc {
    /// Free energies of AB, AA, BB, A and B in kcal/mol
    #[arg(
        value_names = ["AB", "AA", "BB", "A", "B"],
        num_args = 5,
        required = true,
        allow_negative_numbers = true
    )]
    pub energies: Vec<f64>,

    /// File with initial concentrations; standard input is read if omitted
    #[arg(short = 'c', long = "concfile")]
    pub concfile: Option<PathBuf>,

    /// Temperature in degrees Celsius
    #[arg(
        short = 'T',
        long = "temp",
        default_value_t = DEFAULT_TEMPERATURE,
        allow_negative_numbers = true
    )]
    pub temperature: f64,
}

impl Conc {
    fn dimer_energies(&self) -> Result<DimerEnergies> {
        let &[ab, aa, bb, a, b] = self.energies.as_slice() else {
            bail!("Expected 5 free energies (AB AA BB A B), got {}", self.energies.len());
        };
        Ok(DimerEnergies { ab, aa, bb, a, b })
    }
}

impl Command for Conc {
    fn execute(&self, _command_line: &str) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature < -273.15 {
            bail!("--temp must be above absolute zero, got {}", self.temperature);
        }
        let energies = self.dimer_energies()?;

        let rows = match &self.concfile {
            Some(path) => {
                validate_file_exists(path, "Concentration")?;
                read_concentration_file(path)?
            }
            None => parse_concentrations(io::stdin().lock(), "<stdin>")?,
        };
        if rows.is_empty() {
            bail!("No initial concentrations given");
        }
        info!("Solving {} concentration row(s) at {} C", rows.len(), self.temperature);

        let results = solve(&energies, thermal_energy(self.temperature), &rows)?;
        for (index, result) in results.iter().enumerate() {
            if !result.converged {
                warn!("Equilibrium concentrations did not converge for row {}", index + 1);
            }
        }

        let mut out = io::stdout().lock();
        out.write_all(energies.format_block().as_bytes())?;
        out.write_all(format_table(&results).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}
