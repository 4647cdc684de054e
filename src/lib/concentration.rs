//! Equilibrium concentrations of dimer species.
//!
//! Two strands A and B in solution form the complexes AB, AA and BB. Given the
//! ensemble free energies of the five species and the initial concentrations of A
//! and B, mass action determines the equilibrium concentrations:
//!
//! ```text
//! [AB] = K_AB [A][B]      K_AB = exp(-(G_AB - G_A - G_B) / kT)
//! [AA] = K_AA [A]^2       K_AA = exp(-(G_AA - 2 G_A) / kT)
//! [BB] = K_BB [B]^2       K_BB = exp(-(G_BB - 2 G_B) / kT)
//! A0   = [A] + [AB] + 2 [AA]
//! B0   = [B] + [AB] + 2 [BB]
//! ```
//!
//! The free monomer concentrations are found with a damped Newton iteration.
//! Results are reported relative to the total initial mass `A0 + B0`, with every
//! dimer counted with both of its strands so that the five fractions sum to one.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{MultifoldError, Result};
use crate::output::format_general;

/// Relative step size below which the iteration has converged.
const TOLERANCE: f64 = 1e-10;

/// Iteration limit of the Newton solver.
const MAX_ITERATIONS: usize = 10_000;

/// Ensemble free energies (kcal/mol) of the five species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimerEnergies {
    /// Heterodimer AB.
    pub ab: f64,
    /// Homodimer AA.
    pub aa: f64,
    /// Homodimer BB.
    pub bb: f64,
    /// Monomer A.
    pub a: f64,
    /// Monomer B.
    pub b: f64,
}

impl DimerEnergies {
    /// Dimerization constants `(K_AB, K_AA, K_BB)` at thermal energy `kt`.
    #[must_use]
    pub fn equilibrium_constants(&self, kt: f64) -> EquilibriumConstants {
        EquilibriumConstants {
            ab: (-(self.ab - self.a - self.b) / kt).exp(),
            aa: (-(self.aa - 2.0 * self.a) / kt).exp(),
            bb: (-(self.bb - 2.0 * self.b) / kt).exp(),
        }
    }

    /// The "Free Energies" block of structured output.
    #[must_use]
    pub fn format_block(&self) -> String {
        format!(
            "Free Energies:\nAB\t\tAA\t\tBB\t\tA\t\tB\n{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\n",
            self.ab, self.aa, self.bb, self.a, self.b
        )
    }
}

/// Dimerization constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquilibriumConstants {
    /// Heterodimer constant.
    pub ab: f64,
    /// Homodimer constant of A.
    pub aa: f64,
    /// Homodimer constant of B.
    pub bb: f64,
}

/// Initial concentrations (mol/l) of the two strands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialConcentration {
    /// Strand A.
    pub a: f64,
    /// Strand B.
    pub b: f64,
}

/// Equilibrium for one row, as fractions of the total initial mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equilibrium {
    /// The initial concentrations of the row.
    pub initial: InitialConcentration,
    /// Mass fraction bound in AB.
    pub ab: f64,
    /// Mass fraction bound in AA.
    pub aa: f64,
    /// Mass fraction bound in BB.
    pub bb: f64,
    /// Mass fraction of free A.
    pub a: f64,
    /// Mass fraction of free B.
    pub b: f64,
    /// Whether the solver converged within the iteration limit.
    pub converged: bool,
}

impl Equilibrium {
    /// Sum of the five fractions; one up to rounding.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.ab + self.aa + self.bb + self.a + self.b
    }
}

/// Free monomer concentrations `(A, B)` at equilibrium, and whether the solver converged.
#[must_use]
pub fn free_monomers(k: &EquilibriumConstants, initial: InitialConcentration) -> (f64, f64, bool) {
    let (a0, b0) = (initial.a, initial.b);
    let (mut ca, mut cb) = (a0, b0);

    for _ in 0..MAX_ITERATIONS {
        let fa = ca + 2.0 * k.aa * ca * ca + k.ab * ca * cb - a0;
        let fb = cb + 2.0 * k.bb * cb * cb + k.ab * ca * cb - b0;
        let daa = 1.0 + 4.0 * k.aa * ca + k.ab * cb;
        let dab = k.ab * ca;
        let dba = k.ab * cb;
        let dbb = 1.0 + 4.0 * k.bb * cb + k.ab * ca;
        // positive for non-negative concentrations
        let det = daa * dbb - dab * dba;

        let step_a = if a0 > 0.0 { (fa * dbb - fb * dab) / det } else { 0.0 };
        let step_b = if b0 > 0.0 { (fb * daa - fa * dba) / det } else { 0.0 };

        let next_a = damped(ca, step_a);
        let next_b = damped(cb, step_b);
        let converged = relative_change(ca, next_a) < TOLERANCE
            && relative_change(cb, next_b) < TOLERANCE;
        ca = next_a;
        cb = next_b;
        if converged {
            return (ca, cb, true);
        }
    }
    (ca, cb, false)
}

/// Applies a Newton step, halving the concentration instead if the step would make
/// it non-positive.
fn damped(current: f64, step: f64) -> f64 {
    let next = current - step;
    if next <= 0.0 && current > 0.0 { current / 2.0 } else { next }
}

fn relative_change(old: f64, new: f64) -> f64 {
    if old == 0.0 { new.abs() } else { ((new - old) / old).abs() }
}

/// Solves one row.
///
/// # Errors
///
/// Returns [`MultifoldError::ZeroTotalMass`] if `A0 + B0` is not positive; `row` is
/// the 1-based row index reported in that error.
pub fn solve_row(
    k: &EquilibriumConstants,
    initial: InitialConcentration,
    row: usize,
) -> Result<Equilibrium> {
    let total = initial.a + initial.b;
    if total <= 0.0 || initial.a < 0.0 || initial.b < 0.0 {
        return Err(MultifoldError::ZeroTotalMass { row });
    }
    let (ca, cb, converged) = free_monomers(k, initial);
    Ok(Equilibrium {
        initial,
        ab: 2.0 * k.ab * ca * cb / total,
        aa: 2.0 * k.aa * ca * ca / total,
        bb: 2.0 * k.bb * cb * cb / total,
        a: ca / total,
        b: cb / total,
        converged,
    })
}

/// Solves every row of a concentration problem.
///
/// # Errors
///
/// Returns the first row error.
pub fn solve(
    energies: &DimerEnergies,
    kt: f64,
    rows: &[InitialConcentration],
) -> Result<Vec<Equilibrium>> {
    let k = energies.equilibrium_constants(kt);
    rows.iter().enumerate().map(|(index, &initial)| solve_row(&k, initial, index + 1)).collect()
}

/// Parses initial concentration pairs, one `A0 B0` pair per line.
///
/// Parsing stops at the first line that does not start with two numbers, or at a
/// pair where both values are non-positive (the sentinel).
///
/// # Errors
///
/// Returns [`MultifoldError::InvalidFileFormat`] if a line has a single negative
/// value, or [`MultifoldError::UnreadableFile`] on I/O failure.
pub fn parse_concentrations<R: BufRead>(
    reader: R,
    source: &str,
) -> Result<Vec<InitialConcentration>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| MultifoldError::UnreadableFile {
            file_type: "concentration".to_string(),
            path: source.to_string(),
            source: e,
        })?;
        let mut fields = line.split_whitespace().map(str::parse::<f64>);
        let (Some(Ok(a)), Some(Ok(b))) = (fields.next(), fields.next()) else {
            break;
        };
        if a <= 0.0 && b <= 0.0 {
            break;
        }
        if a < 0.0 || b < 0.0 {
            return Err(MultifoldError::InvalidFileFormat {
                file_type: "concentration".to_string(),
                path: source.to_string(),
                reason: format!("line {}: negative concentration", index + 1),
            });
        }
        rows.push(InitialConcentration { a, b });
    }
    Ok(rows)
}

/// Reads a concentration file.
///
/// # Errors
///
/// Returns [`MultifoldError::UnreadableFile`] if the file cannot be opened.
pub fn read_concentration_file<P: AsRef<Path>>(path: P) -> Result<Vec<InitialConcentration>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MultifoldError::UnreadableFile {
        file_type: "concentration".to_string(),
        path: path.display().to_string(),
        source,
    })?;
    parse_concentrations(BufReader::new(file), &path.display().to_string())
}

/// Formats the concentration table of structured output.
#[must_use]
pub fn format_table(rows: &[Equilibrium]) -> String {
    let mut table = String::from(
        "Initial concentrations\t\trelative Equilibrium concentrations\n\
         A\t\tB\t\tAB\t\tAA\t\tBB\t\tA\t\tB\n",
    );
    for row in rows {
        let _ = writeln!(
            table,
            "{:<10}\t{:<10}\t{:.5} \t{:.5} \t{:.5} \t{:.5} \t{:.5}",
            format_general(row.initial.a),
            format_general(row.initial.b),
            row.ab,
            row.aa,
            row.bb,
            row.a,
            row.b
        );
    }
    table
}
