//! Fold engine interface.
//!
//! The driver treats structure prediction as an external collaborator. A shared
//! [`FoldEngine`] hands out one [`FoldCompound`] per sequence; the compound owns all
//! working state of the dynamic programs and is dropped at the end of the record's
//! pipeline, so no two concurrently processed records ever share mutable fold state.
//!
//! [`PairEnergyEngine`] is a small built-in engine with a base-pair energy model. It
//! is enough to drive the complete pipeline (MFE, partition function, pair
//! probabilities, dimer energies) without an external thermodynamic library.

pub mod ensemble;
pub mod pair_energy;

pub use ensemble::{BasePairProbabilities, Ensemble};
pub use pair_energy::{PairEnergyCompound, PairEnergyEngine};

use crate::constraints::HardConstraints;

/// Default folding temperature in degrees Celsius.
pub const DEFAULT_TEMPERATURE: f64 = 37.0;

/// Gas constant in kcal/(mol K).
pub const GAS_CONSTANT: f64 = 1.98717e-3;

/// Thermal energy kT in kcal/mol at `temperature` degrees Celsius.
#[must_use]
pub fn thermal_energy(temperature: f64) -> f64 {
    (temperature + 273.15) * GAS_CONSTANT
}

/// Energy model parameters shared by all compounds of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// Folding temperature in degrees Celsius.
    pub temperature: f64,
    /// Maximum distance (in nucleotides) between the two bases of a pair.
    pub max_bp_span: Option<usize>,
    /// Restrict forced pairs to canonical (Watson-Crick and GU) pairs.
    pub canonical_only: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { temperature: DEFAULT_TEMPERATURE, max_bp_span: None, canonical_only: false }
    }
}

/// A structure prediction engine, shared read-only by all workers.
pub trait FoldEngine: Send + Sync {
    /// The per-sequence working state.
    type Compound: FoldCompound;

    /// Acquires fresh working state for `sequence`.
    ///
    /// `sequence` carries no strand separator; `split` is the length of the first
    /// strand for two-strand input.
    fn compound(&self, sequence: &str, split: Option<usize>, settings: &ModelSettings)
    -> Self::Compound;
}

/// Working state for folding one sequence. Owned by a single pipeline invocation.
pub trait FoldCompound {
    /// Replaces the hard constraints used by all subsequent computations.
    fn set_constraints(&mut self, constraints: HardConstraints);

    /// Minimum free energy structure (dot-bracket, no separator) and its energy.
    ///
    /// Returns `None` if the constraints admit no structure.
    fn mfe(&mut self) -> Option<(String, f64)>;

    /// Partition function of the ensemble.
    ///
    /// `mfe_energy` is used to scale the dynamic programs; pair probabilities are
    /// computed only if `compute_bpp` is set. Returns `None` if the constraints admit
    /// no structure.
    fn partition_function(&mut self, mfe_energy: f64, compute_bpp: bool) -> Option<Ensemble>;

    /// Free energy of a given structure (dot-bracket, no separator).
    fn eval_structure(&self, structure: &str) -> f64;

    /// Thermal energy kT in kcal/mol used by this compound.
    fn kt(&self) -> f64;
}
