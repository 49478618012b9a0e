//! Fitness: verdicts scored into [0, 1], cached by fix identity.
//!
//! Lower is better: 0 means every property passed, 1 is worst. The cache
//! is never invalidated within a run and is guarded for single-writer
//! access.

use std::collections::HashMap;
use std::sync::Mutex;

use mender_sandbox::Verdict;

use crate::fix::EFix;

/// Score a verdict. `AllPass` is perfect; abnormal outcomes are worst;
/// partial results score by the fraction of failing properties.
pub fn verdict_fitness(verdict: &Verdict) -> f64 {
    match verdict {
        Verdict::AllPass => 0.0,
        Verdict::AllFail | Verdict::Timeout | Verdict::WrongShape => 1.0,
        Verdict::Partial(bits) => {
            if bits.is_empty() {
                return 0.0;
            }
            let passed = bits.iter().filter(|&&b| b).count() as f64;
            1.0 - passed / bits.len() as f64
        }
    }
}

/// Fix-keyed fitness cache, write-through, never invalidated within a run.
#[derive(Debug, Default)]
pub struct FitnessCache {
    scores: Mutex<HashMap<EFix, f64>>,
}

impl FitnessCache {
    pub fn new() -> FitnessCache {
        FitnessCache::default()
    }

    pub fn get(&self, fix: &EFix) -> Option<f64> {
        self.scores.lock().unwrap().get(fix).copied()
    }

    pub fn insert(&self, fix: EFix, score: f64) {
        self.scores.lock().unwrap().insert(fix, score);
    }

    pub fn len(&self) -> usize {
        self.scores.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
