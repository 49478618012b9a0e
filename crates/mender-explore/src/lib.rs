//! Search core of the mender repair engine: candidate synthesis, repair,
//! fix sets, fitness, and the genetic search over fixes.

pub mod checks;
pub mod fitness;
pub mod fix;
pub mod repair;
pub mod rng;
pub mod search;
pub mod synth;

pub use checks::{check_candidates, check_fixes};
pub use fitness::{verdict_fitness, FitnessCache};
pub use fix::EFix;
pub use repair::{repair, repair_attempt};
pub use rng::SearchRng;
pub use search::genetic::{genetic_search, SearchOutcome, WIN_THRESHOLD};
pub use search::genome::{GenomeHost, RepairHost};
pub use search::{GeneticConfig, IslandConfig, TournamentConfig};
pub use synth::Synthesizer;

/// Errors of the search layers. Candidate-level failures never surface
/// here; they are absorbed into verdicts.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("oracle error: {0}")]
    Oracle(#[from] mender_oracle::OracleError),

    #[error(
        "repair attempt produced no candidate edits for a failing program; \
         the target may not be repairable in this context"
    )]
    NoInitialEdits,

    #[error("invalid search configuration: {0}")]
    Config(String),
}
