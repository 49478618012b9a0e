//! Genetic search over fixes.
//!
//! The driver (`genetic`) is generic over a genome capability set
//! (`genome::GenomeHost`); the fix instantiation (`RepairHost`) wires it to
//! the repair driver and the fitness cache. The minimizer shrinks winning
//! fixes by subset enumeration.

pub mod genetic;
pub mod genome;
pub mod minimize;

use serde::{Deserialize, Serialize};

use crate::SearchError;

/// Tournament pre-selection; absence means environmental selection with
/// elitism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Individuals drawn (with replacement) per round.
    pub size: usize,
    /// Rounds per champion, keeping the running best.
    pub rounds: usize,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self { size: 4, rounds: 2 }
    }
}

/// Parallel-island evolution; absence means a single population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandConfig {
    pub count: usize,
    /// Generations between migrations.
    pub migration_interval: u64,
    /// Individuals exchanged per island per migration.
    pub migration_size: usize,
    /// Rotate migrants around the ring; otherwise shuffle across islands.
    pub ringwise: bool,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self {
            count: 3,
            migration_interval: 5,
            migration_size: 2,
            ringwise: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Per-individual probability of mutation each generation.
    pub mutation_rate: f64,
    /// Per-pair probability of crossover.
    pub crossover_rate: f64,
    /// Within mutation, probability of shrinking the fix by one entry.
    pub drop_rate: f64,
    /// Maximum generations.
    pub iterations: u64,
    /// Population size; must be even and at least 2.
    pub population_size: usize,
    /// Wall-clock budget, checked between generations.
    pub timeout_minutes: u64,
    /// Return as soon as a generation produces a perfect individual.
    pub stop_on_results: bool,
    /// Remove winners from the continuing population and refill.
    pub replace_winners: bool,
    /// Minimize final winners by subset enumeration.
    pub try_minimize_fixes: bool,
    pub tournament: Option<TournamentConfig>,
    pub island: Option<IslandConfig>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.2,
            crossover_rate: 0.05,
            drop_rate: 0.2,
            iterations: 50,
            population_size: 64,
            timeout_minutes: 5,
            stop_on_results: true,
            replace_winners: true,
            try_minimize_fixes: true,
            tournament: None,
            island: None,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        fn rate(name: &str, value: f64) -> Result<(), SearchError> {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::Config(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
            Ok(())
        }
        rate("mutation_rate", self.mutation_rate)?;
        rate("crossover_rate", self.crossover_rate)?;
        rate("drop_rate", self.drop_rate)?;
        if self.iterations < 1 {
            return Err(SearchError::Config("iterations must be at least 1".into()));
        }
        if self.population_size < 2 || self.population_size % 2 != 0 {
            return Err(SearchError::Config(format!(
                "population_size must be even and at least 2, got {}",
                self.population_size
            )));
        }
        if let Some(t) = &self.tournament {
            if t.size < 1 || t.rounds < 1 {
                return Err(SearchError::Config(
                    "tournament size and rounds must be at least 1".into(),
                ));
            }
        }
        if let Some(i) = &self.island {
            if i.count < 1 || i.migration_interval < 1 {
                return Err(SearchError::Config(
                    "island count and migration interval must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}
