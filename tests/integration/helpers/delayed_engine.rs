//! A fold engine that takes longer for chosen sequences, or panics on them.

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use multifold_lib::fold::{FoldEngine, ModelSettings, PairEnergyCompound, PairEnergyEngine};

/// Wraps the built-in engine and sleeps before folding selected sequences, or
/// panics when asked to fold others.
///
/// Sequences are matched after normalization (upper case, `U` for `T`, no `&`).
#[derive(Debug, Default)]
pub struct DelayedEngine {
    inner: PairEnergyEngine,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
}

impl DelayedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every compound acquired for `sequence` by `millis` milliseconds.
    pub fn delay(mut self, sequence: &str, millis: u64) -> Self {
        self.delays.insert(sequence.to_string(), Duration::from_millis(millis));
        self
    }

    /// Panics whenever a compound is acquired for `sequence`.
    pub fn panic_on(mut self, sequence: &str) -> Self {
        self.panics.insert(sequence.to_string());
        self
    }
}

impl FoldEngine for DelayedEngine {
    type Compound = PairEnergyCompound;

    fn compound(
        &self,
        sequence: &str,
        split: Option<usize>,
        settings: &ModelSettings,
    ) -> PairEnergyCompound {
        if let Some(delay) = self.delays.get(sequence) {
            thread::sleep(*delay);
        }
        assert!(!self.panics.contains(sequence), "engine failure on {sequence}");
        self.inner.compound(sequence, split, settings)
    }
}
