//! Built-in base-pair energy model.
//!
//! Every base pair contributes a fixed stacking-free energy (GC -3.0, AU -2.0,
//! GU -1.0 kcal/mol); loops are free. Hairpins within one strand need at least
//! [`MIN_HAIRPIN`] unpaired nucleotides, and two-strand input pays a constant duplex
//! initiation penalty. The model is a Nussinov-style grammar, which keeps the MFE,
//! partition function and outside (pair probability) recursions short while still
//! honouring every hard constraint.

use crate::constraints::HardConstraints;

use super::{
    BasePairProbabilities, Ensemble, FoldCompound, FoldEngine, ModelSettings, thermal_energy,
};

/// Minimum number of unpaired nucleotides enclosed by a hairpin.
pub const MIN_HAIRPIN: usize = 3;

/// Free energy penalty for bringing two strands together, in kcal/mol.
pub const DUPLEX_INIT: f64 = 4.1;

/// Scaling factor applied to the MFE when estimating the per-nucleotide weight.
const SCALE_FACTOR: f64 = 1.07;

/// Energy of a canonical pair, or `None` if the bases cannot pair.
#[must_use]
pub fn pair_energy(a: u8, b: u8) -> Option<f64> {
    match (a, b) {
        (b'G', b'C') | (b'C', b'G') => Some(-3.0),
        (b'A', b'U') | (b'U', b'A') => Some(-2.0),
        (b'G', b'U') | (b'U', b'G') => Some(-1.0),
        _ => None,
    }
}

/// The built-in engine. Stateless; every compound owns its own matrices.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairEnergyEngine;

impl PairEnergyEngine {
    /// Creates the engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FoldEngine for PairEnergyEngine {
    type Compound = PairEnergyCompound;

    fn compound(
        &self,
        sequence: &str,
        split: Option<usize>,
        settings: &ModelSettings,
    ) -> PairEnergyCompound {
        PairEnergyCompound::new(sequence, split, settings)
    }
}

/// Working state for one sequence.
#[derive(Debug, Clone)]
pub struct PairEnergyCompound {
    sequence: Vec<u8>,
    split: Option<usize>,
    settings: ModelSettings,
    constraints: HardConstraints,
    kt: f64,
}

impl PairEnergyCompound {
    /// Creates unconstrained working state.
    #[must_use]
    pub fn new(sequence: &str, split: Option<usize>, settings: &ModelSettings) -> Self {
        let sequence = sequence.as_bytes().to_vec();
        let constraints = HardConstraints::unconstrained(sequence.len());
        Self {
            sequence,
            split,
            settings: settings.clone(),
            constraints,
            kt: thermal_energy(settings.temperature),
        }
    }

    fn is_dimer(&self) -> bool {
        self.split.is_some_and(|s| s > 0 && s < self.sequence.len())
    }

    fn init_energy(&self) -> f64 {
        if self.is_dimer() { DUPLEX_INIT } else { 0.0 }
    }

    fn crosses_cut(&self, i: usize, j: usize) -> bool {
        self.split.is_some_and(|s| i < s && s <= j)
    }

    /// Energy of the pair `(i, j)` under the current constraints, or `None` if the
    /// pair is not admissible.
    fn admissible_pair(&self, i: usize, j: usize) -> Option<f64> {
        if !self.crosses_cut(i, j) && j - i - 1 < MIN_HAIRPIN {
            return None;
        }
        if self.settings.max_bp_span.is_some_and(|span| j - i + 1 > span) {
            return None;
        }
        if !self.constraints.pair_allowed(i, j) {
            return None;
        }
        match pair_energy(self.sequence[i], self.sequence[j]) {
            Some(energy) => Some(energy),
            None if self.constraints.is_forced(i, j) && !self.settings.canonical_only => Some(0.0),
            None => None,
        }
    }

    /// Table of admissible pair energies indexed by `i * n + j`.
    fn pair_table(&self) -> Vec<Option<f64>> {
        let n = self.sequence.len();
        let mut table = vec![None; n * n];
        for i in 0..n {
            for j in i + 1..n {
                table[i * n + j] = self.admissible_pair(i, j);
            }
        }
        table
    }
}

impl FoldCompound for PairEnergyCompound {
    fn set_constraints(&mut self, constraints: HardConstraints) {
        self.constraints = constraints;
    }

    fn mfe(&mut self) -> Option<(String, f64)> {
        let n = self.sequence.len();
        let width = n + 1;
        let pairs = self.pair_table();

        // f[i][j]: minimum energy of the half-open interval [i, j)
        let mut f = vec![f64::INFINITY; width * width];
        let mut choice: Vec<Option<usize>> = vec![None; width * width];
        for i in 0..=n {
            f[i * width + i] = 0.0;
        }
        for span in 1..=n {
            for i in 0..=n - span {
                let j = i + span;
                let last = j - 1;
                let mut best = if self.constraints.unpaired_allowed(last) {
                    f[i * width + last]
                } else {
                    f64::INFINITY
                };
                let mut best_k = None;
                for k in i..last {
                    let Some(energy) = pairs[k * n + last] else { continue };
                    let value = f[i * width + k] + energy + f[(k + 1) * width + last];
                    if value < best {
                        best = value;
                        best_k = Some(k);
                    }
                }
                f[i * width + j] = best;
                choice[i * width + j] = best_k;
            }
        }

        let total = f[n];
        if !total.is_finite() {
            return None;
        }

        let mut structure = vec![b'.'; n];
        let mut stack = vec![(0, n)];
        while let Some((i, j)) = stack.pop() {
            if j <= i {
                continue;
            }
            match choice[i * width + j] {
                Some(k) => {
                    structure[k] = b'(';
                    structure[j - 1] = b')';
                    stack.push((i, k));
                    stack.push((k + 1, j - 1));
                }
                None => stack.push((i, j - 1)),
            }
        }
        Some((String::from_utf8_lossy(&structure).into_owned(), total + self.init_energy()))
    }

    fn partition_function(&mut self, mfe_energy: f64, compute_bpp: bool) -> Option<Ensemble> {
        let n = self.sequence.len();
        let width = n + 1;
        let kt = self.kt;
        let weights: Vec<f64> =
            self.pair_table().into_iter().map(|e| e.map_or(0.0, |e| (-e / kt).exp())).collect();

        // Per-nucleotide scale keeps the scaled sums near one for long sequences.
        let folding_energy = (mfe_energy - self.init_energy()).min(0.0);
        let scale =
            if n == 0 { 1.0 } else { (-(SCALE_FACTOR * folding_energy) / (kt * n as f64)).exp() };
        let scale2 = scale * scale;

        // q: scaled partition function of [i, j); qb: same with i and j-1 paired.
        let mut q = vec![0.0; width * width];
        let mut qb = vec![0.0; width * width];
        for i in 0..=n {
            q[i * width + i] = 1.0;
        }
        for span in 1..=n {
            for i in 0..=n - span {
                let j = i + span;
                let last = j - 1;
                if span >= 2 {
                    let w = weights[i * n + last];
                    if w > 0.0 {
                        qb[i * width + j] = w * q[(i + 1) * width + last] / scale2;
                    }
                }
                let mut sum = if self.constraints.unpaired_allowed(last) {
                    q[i * width + last] / scale
                } else {
                    0.0
                };
                for k in i..last {
                    let b = qb[k * width + j];
                    if b > 0.0 {
                        sum += q[i * width + k] * b;
                    }
                }
                q[i * width + j] = sum;
            }
        }

        let total = q[n];
        if total <= 0.0 || !total.is_finite() {
            return None;
        }
        let energy = -kt * (total.ln() + n as f64 * scale.ln()) + self.init_energy();

        let probabilities = compute_bpp.then(|| {
            let mut qo = vec![0.0; width * width];
            let mut qbo = vec![0.0; width * width];
            qo[n] = 1.0;
            for span in (1..=n).rev() {
                for i in 0..=n - span {
                    let j = i + span;
                    let outside = qo[i * width + j];
                    if outside == 0.0 {
                        continue;
                    }
                    let last = j - 1;
                    if self.constraints.unpaired_allowed(last) {
                        qo[i * width + last] += outside / scale;
                    }
                    for k in i..last {
                        let b = qb[k * width + j];
                        if b > 0.0 {
                            qo[i * width + k] += outside * b;
                            qbo[k * width + j] += outside * q[i * width + k];
                        }
                    }
                }
                for k in 0..=n - span {
                    let j = k + span;
                    let outside = qbo[k * width + j];
                    if span >= 2 && outside > 0.0 {
                        qo[(k + 1) * width + j - 1] += outside * weights[k * n + j - 1] / scale2;
                    }
                }
            }

            let mut bpp = BasePairProbabilities::new(n);
            for k in 0..n {
                for j in k + 2..=n {
                    let b = qb[k * width + j];
                    if b > 0.0 {
                        bpp.set(k, j - 1, (b * qbo[k * width + j] / total).min(1.0));
                    }
                }
            }
            bpp
        });

        Some(Ensemble { energy, probabilities })
    }

    fn eval_structure(&self, structure: &str) -> f64 {
        let mut stack = Vec::new();
        let mut energy = self.init_energy();
        for (j, symbol) in structure.bytes().enumerate() {
            match symbol {
                b'(' => stack.push(j),
                b')' => {
                    if let Some(i) = stack.pop() {
                        if let (Some(&a), Some(&b)) = (self.sequence.get(i), self.sequence.get(j)) {
                            energy += pair_energy(a, b).unwrap_or(0.0);
                        }
                    }
                }
                _ => {}
            }
        }
        energy
    }

    fn kt(&self) -> f64 {
        self.kt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn compound(sequence: &str, split: Option<usize>) -> PairEnergyCompound {
        PairEnergyEngine::new().compound(sequence, split, &ModelSettings::default())
    }

    #[test]
    fn test_pair_energy_table() {
        assert_eq!(pair_energy(b'G', b'C'), Some(-3.0));
        assert_eq!(pair_energy(b'U', b'A'), Some(-2.0));
        assert_eq!(pair_energy(b'U', b'G'), Some(-1.0));
        assert_eq!(pair_energy(b'A', b'A'), None);
    }

    #[test]
    fn test_mfe_hairpin() {
        let mut fc = compound("GGGAAACCC", None);
        let (structure, energy) = fc.mfe().unwrap();
        assert_eq!(structure, "(((...)))");
        assert_relative_eq!(energy, -9.0);
        assert_relative_eq!(fc.eval_structure(&structure), -9.0);
    }

    #[test]
    fn test_mfe_too_short_for_hairpin() {
        let mut fc = compound("GAAC", None);
        let (structure, energy) = fc.mfe().unwrap();
        assert_eq!(structure, "....");
        assert_relative_eq!(energy, 0.0);
    }

    #[test]
    fn test_mfe_dimer_pays_initiation() {
        let mut fc = compound("GGGCCC", Some(3));
        let (structure, energy) = fc.mfe().unwrap();
        assert_eq!(structure, "((()))");
        assert_relative_eq!(energy, -9.0 + DUPLEX_INIT);
    }

    #[test]
    fn test_mfe_respects_unpaired_constraint() {
        let mut fc = compound("GGGAAACCC", None);
        let mut hc = HardConstraints::unconstrained(9);
        hc.apply_dot_bracket("x........", false).unwrap();
        fc.set_constraints(hc);
        let (structure, energy) = fc.mfe().unwrap();
        assert_eq!(&structure[..1], ".");
        assert_relative_eq!(energy, -6.0);
    }

    #[test]
    fn test_mfe_empty_solution_set() {
        let mut fc = compound("AAAAAAA", None);
        let mut hc = HardConstraints::unconstrained(7);
        hc.apply_dot_bracket("|......", false).unwrap();
        fc.set_constraints(hc);
        assert!(fc.mfe().is_none());
        assert!(fc.partition_function(0.0, true).is_none());
    }

    #[test]
    fn test_forced_non_canonical_pair() {
        let mut fc = compound("AAAAAAA", None);
        let mut hc = HardConstraints::unconstrained(7);
        hc.apply_dot_bracket("(.....)", true).unwrap();
        fc.set_constraints(hc);
        let (structure, energy) = fc.mfe().unwrap();
        assert_eq!(structure, "(.....)");
        assert_relative_eq!(energy, 0.0);
    }

    #[test]
    fn test_partition_function_of_unpairable_sequence() {
        let mut fc = compound("AAAAAA", None);
        let ensemble = fc.partition_function(0.0, true).unwrap();
        assert_relative_eq!(ensemble.energy, 0.0, epsilon = 1e-12);
        let bpp = ensemble.probabilities.unwrap();
        assert!(bpp.pairs_above(1e-12).is_empty());
    }

    #[test]
    fn test_partition_function_single_possible_pair() {
        // Only G1-C5 can pair: Z = 1 + exp(3/kT).
        let mut fc = compound("GAAAC", None);
        let kt = fc.kt();
        let (_, mfe) = fc.mfe().unwrap();
        let ensemble = fc.partition_function(mfe, true).unwrap();
        let boltzmann = (3.0 / kt).exp();
        assert_relative_eq!(ensemble.energy, -kt * (1.0 + boltzmann).ln(), epsilon = 1e-9);
        let bpp = ensemble.probabilities.unwrap();
        assert_relative_eq!(bpp.get(0, 4), boltzmann / (1.0 + boltzmann), epsilon = 1e-9);
    }

    #[test]
    fn test_ensemble_energy_below_mfe_and_probabilities_bounded() {
        let mut fc = compound("GGGGAAACCCCAUAUAGCGCAAAGCGCUAUAU", None);
        let (_, mfe) = fc.mfe().unwrap();
        let ensemble = fc.partition_function(mfe, true).unwrap();
        assert!(ensemble.energy <= mfe + 1e-9);
        let bpp = ensemble.probabilities.unwrap();
        for i in 0..bpp.len() {
            let paired: f64 = (0..bpp.len()).filter(|&j| j != i).map(|j| bpp.get(i, j)).sum();
            assert!(paired <= 1.0 + 1e-9, "position {i} paired with probability {paired}");
        }
    }

    #[test]
    fn test_max_bp_span() {
        let settings = ModelSettings { max_bp_span: Some(5), ..ModelSettings::default() };
        let mut fc = PairEnergyEngine::new().compound("GAAAAAAC", None, &settings);
        let (structure, _) = fc.mfe().unwrap();
        assert_eq!(structure, "........");
    }
}
