//! Ensemble results and structures derived from base-pair probabilities.

/// Pairs with a probability above this value form the centroid structure.
const CENTROID_THRESHOLD: f64 = 0.5;

/// Probability above which a single state dominates the propensity symbol.
const DOMINANT: f64 = 0.667;

/// Result of a partition function computation.
#[derive(Debug, Clone)]
pub struct Ensemble {
    /// Ensemble free energy in kcal/mol.
    pub energy: f64,
    /// Base-pair probabilities, if requested.
    pub probabilities: Option<BasePairProbabilities>,
}

/// Symmetric matrix of base-pair probabilities for a sequence of `len` nucleotides.
///
/// Positions are 0-based; only pairs `(i, j)` with `i < j` are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct BasePairProbabilities {
    len: usize,
    probs: Vec<f64>,
}

impl BasePairProbabilities {
    /// An all-zero matrix.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { len, probs: vec![0.0; len * len] }
    }

    /// Number of nucleotides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Probability that `i` and `j` pair with each other.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.probs[i * self.len + j]
    }

    /// Sets the probability of the pair `(i, j)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, p: f64) {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.probs[i * self.len + j] = p;
    }

    /// All pairs with a probability of at least `threshold`, ordered by position.
    #[must_use]
    pub fn pairs_above(&self, threshold: f64) -> Vec<(usize, usize, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.len {
            for j in i + 1..self.len {
                let p = self.get(i, j);
                if p > 0.0 && p >= threshold {
                    pairs.push((i, j, p));
                }
            }
        }
        pairs
    }

    /// Per-position probabilities of pairing downstream, pairing upstream and staying
    /// unpaired.
    fn position_states(&self) -> Vec<[f64; 3]> {
        let mut states = vec![[0.0, 0.0, 1.0]; self.len];
        for i in 0..self.len {
            for j in i + 1..self.len {
                let p = self.get(i, j);
                if p > 0.0 {
                    states[i][0] += p;
                    states[j][1] += p;
                }
            }
        }
        for state in &mut states {
            state[2] = (1.0 - state[0] - state[1]).max(0.0);
        }
        states
    }

    /// Per-position pairing propensity string.
    ///
    /// `.` `(` `)` mark positions dominated by one state, `{` `}` `|` positions more
    /// likely paired than not, `,` positions more likely unpaired, `:` the rest.
    #[must_use]
    pub fn propensity(&self) -> String {
        self.position_states()
            .into_iter()
            .map(|[down, up, unpaired]| {
                let paired = down + up;
                if unpaired > DOMINANT {
                    '.'
                } else if down > DOMINANT {
                    '('
                } else if up > DOMINANT {
                    ')'
                } else if paired > unpaired {
                    if down / paired > DOMINANT {
                        '{'
                    } else if up / paired > DOMINANT {
                        '}'
                    } else {
                        '|'
                    }
                } else if unpaired > paired {
                    ','
                } else {
                    ':'
                }
            })
            .collect()
    }

    /// Centroid structure and its expected base-pair distance to the ensemble.
    ///
    /// The centroid contains every pair with probability above one half; such pairs
    /// never conflict.
    #[must_use]
    pub fn centroid(&self) -> (String, f64) {
        let mut structure = vec![b'.'; self.len];
        let mut distance = 0.0;
        for i in 0..self.len {
            for j in i + 1..self.len {
                let p = self.get(i, j);
                if p > CENTROID_THRESHOLD {
                    structure[i] = b'(';
                    structure[j] = b')';
                    distance += 1.0 - p;
                } else {
                    distance += p;
                }
            }
        }
        (String::from_utf8_lossy(&structure).into_owned(), distance)
    }

    /// Maximum expected accuracy structure and its accuracy score.
    ///
    /// Maximizes `sum(2 * gamma * p_ij)` over pairs plus `sum(p_unpaired(i))` over
    /// unpaired positions.
    #[must_use]
    pub fn mea(&self, gamma: f64) -> (String, f64) {
        let n = self.len;
        let unpaired: Vec<f64> = self.position_states().iter().map(|s| s[2]).collect();
        let candidates: Vec<Vec<(usize, f64)>> = (0..n)
            .map(|i| {
                (i + 1..n)
                    .filter_map(|j| {
                        let p = self.get(i, j);
                        (p > 0.0).then_some((j, 2.0 * gamma * p))
                    })
                    .collect()
            })
            .collect();

        // m[i][j] over half-open intervals [i, j)
        let width = n + 1;
        let mut m = vec![0.0; width * width];
        let mut choice: Vec<Option<usize>> = vec![None; width * width];
        for i in (0..n).rev() {
            for j in i + 1..=n {
                let mut best = m[(i + 1) * width + j] + unpaired[i];
                let mut best_partner = None;
                for &(k, score) in candidates[i].iter().take_while(|(k, _)| *k < j) {
                    let value = score + m[(i + 1) * width + k] + m[(k + 1) * width + j];
                    if value > best {
                        best = value;
                        best_partner = Some(k);
                    }
                }
                m[i * width + j] = best;
                choice[i * width + j] = best_partner;
            }
        }

        let mut structure = vec![b'.'; n];
        let mut stack = vec![(0, n)];
        while let Some((i, j)) = stack.pop() {
            if i >= j {
                continue;
            }
            match choice[i * width + j] {
                Some(k) => {
                    structure[i] = b'(';
                    structure[k] = b')';
                    stack.push((i + 1, k));
                    stack.push((k + 1, j));
                }
                None => stack.push((i + 1, j)),
            }
        }
        (String::from_utf8_lossy(&structure).into_owned(), m[n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hairpin_probabilities() -> BasePairProbabilities {
        let mut bpp = BasePairProbabilities::new(9);
        bpp.set(0, 8, 0.9);
        bpp.set(1, 7, 0.8);
        bpp.set(2, 6, 0.4);
        bpp.set(2, 5, 0.1);
        bpp
    }

    #[test]
    fn test_get_is_symmetric() {
        let bpp = hairpin_probabilities();
        assert_relative_eq!(bpp.get(8, 0), 0.9);
        assert_relative_eq!(bpp.get(3, 4), 0.0);
    }

    #[test]
    fn test_pairs_above_threshold() {
        let bpp = hairpin_probabilities();
        let pairs = bpp.pairs_above(0.3);
        assert_eq!(pairs.iter().map(|&(i, j, _)| (i, j)).collect::<Vec<_>>(), vec![
            (0, 8),
            (1, 7),
            (2, 6)
        ]);
    }

    #[test]
    fn test_centroid() {
        let (structure, distance) = hairpin_probabilities().centroid();
        assert_eq!(structure, "((.....))");
        assert_relative_eq!(distance, 0.1 + 0.2 + 0.4 + 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_mea_weighs_pairs_by_gamma() {
        let (structure, score) = hairpin_probabilities().mea(1.0);
        assert_eq!(structure, "((.....))");
        assert_relative_eq!(score, 2.0 * 1.7 + 0.5 + 1.0 + 1.0 + 0.9 + 0.6, epsilon = 1e-12);

        let (structure, score) = hairpin_probabilities().mea(2.0);
        assert_eq!(structure, "(((...)))");
        assert_relative_eq!(score, 4.0 * 2.1 + 1.0 + 1.0 + 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_mea_small_gamma_prefers_unpaired() {
        let (structure, _) = hairpin_probabilities().mea(0.01);
        assert_eq!(structure, ".........");
    }

    #[test]
    fn test_propensity() {
        let propensity = hairpin_probabilities().propensity();
        assert_eq!(propensity.len(), 9);
        assert!(propensity.starts_with("(("));
        assert!(propensity.ends_with("))"));
        assert_eq!(&propensity[3..5], "..");
    }
}
