//! The repair session: one loaded problem, one validated configuration,
//! and the entry points into the search layers.

use mender_explore::{genetic_search, repair, RepairHost, SearchError, Synthesizer};
use mender_ir::{parse_problem, Problem, Type};
use mender_oracle::CompilerOracle;
use mender_sandbox::CheckRunner;
use serde::Serialize;
use tracing::info;

use crate::config::{ConfigError, RepairConfig};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("problem parse error: {0}")]
    Parse(#[from] mender_ir::ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// One site replacement of a winning fix.
#[derive(Debug, Clone, Serialize)]
pub struct FixEdit {
    pub site: String,
    pub replacement: String,
}

/// One winning fix: its edits and the repaired program rendering.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub edits: Vec<FixEdit>,
    pub repaired: String,
}

/// Serializable summary of an evolve run.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub fixes: Vec<FixReport>,
    pub generations: u64,
    pub elapsed_ms: u128,
    pub fitness_evaluations_cached: usize,
}

#[derive(Debug)]
pub struct RepairSession<'a, O: CompilerOracle> {
    oracle: &'a O,
    problem: Problem,
    config: RepairConfig,
}

impl<'a, O: CompilerOracle> RepairSession<'a, O> {
    pub fn new(
        oracle: &'a O,
        problem: Problem,
        config: RepairConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(RepairSession {
            oracle,
            problem,
            config,
        })
    }

    /// Load a problem from source text.
    pub fn load(
        oracle: &'a O,
        source: &str,
        config: RepairConfig,
    ) -> Result<Self, SessionError> {
        let problem = parse_problem(source)?;
        Self::new(oracle, problem, config)
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// Single-step repair: every property-passing one-edit rewrite of the
    /// target, rendered canonically.
    pub fn repair(&self) -> Result<Vec<String>, SessionError> {
        let runner = CheckRunner::new(self.config.sandbox.clone());
        Ok(repair(
            self.oracle,
            &self.config.oracle_config(),
            &runner,
            &self.problem,
        )?)
    }

    /// Synthesize candidates of `ty` from the problem's context that
    /// satisfy the problem's properties.
    pub fn synthesize(&self, ty: &Type) -> Result<Vec<String>, SessionError> {
        let synth = Synthesizer::new(
            self.oracle,
            self.config.oracle_config(),
            self.config.sandbox.clone(),
        );
        Ok(synth.synthesize(
            self.config.depth,
            &self.problem.context,
            &self.problem.properties,
            ty,
        )?)
    }

    /// Genetic repair over fix sets.
    pub fn evolve(&self) -> Result<RepairReport, SessionError> {
        let mut host = RepairHost::new(
            self.oracle,
            self.config.oracle_config(),
            self.config.sandbox.clone(),
            &self.problem,
            self.config.seed,
            self.config.genetic.drop_rate,
        );
        let outcome = genetic_search(&mut host, &self.config.genetic)?;
        info!(
            winners = outcome.winners.len(),
            generations = outcome.generations,
            "evolution finished"
        );

        let fixes = outcome
            .winners
            .iter()
            .map(|fix| FixReport {
                edits: fix
                    .entries()
                    .map(|(site, replacement)| FixEdit {
                        site: site.to_string(),
                        replacement: replacement.to_string(),
                    })
                    .collect(),
                repaired: fix.apply(&self.problem.target).to_string(),
            })
            .collect();
        Ok(RepairReport {
            fixes,
            generations: outcome.generations,
            elapsed_ms: outcome.elapsed.as_millis(),
            fitness_evaluations_cached: host.cache().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_explore::GeneticConfig;
    use mender_oracle::ReferenceOracle;

    const SUM_PROBLEM: &str = "\
zero :: Int
zero = 0
plus :: Int -> Int -> Int
plus = (+)
target :: [Int] -> Int
target = foldl (-) zero
prop_isSum :: ([Int] -> Int) -> [Int] -> Bool
prop_isSum f xs = f xs == sum xs
";

    #[test]
    fn test_session_rejects_invalid_config() {
        let oracle = ReferenceOracle::new();
        let config = RepairConfig {
            depth: -1,
            ..RepairConfig::default()
        };
        let err = RepairSession::load(&oracle, SUM_PROBLEM, config).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::NegativeDepth(-1))
        ));
    }

    #[test]
    fn test_session_repair() {
        let oracle = ReferenceOracle::new();
        let session =
            RepairSession::load(&oracle, SUM_PROBLEM, RepairConfig::default()).unwrap();
        let fixed = session.repair().unwrap();
        assert_eq!(fixed, vec!["foldl plus zero".to_string()]);
    }

    #[test]
    fn test_session_evolve_reports() {
        let oracle = ReferenceOracle::new();
        let config = RepairConfig {
            genetic: GeneticConfig {
                iterations: 5,
                population_size: 8,
                ..GeneticConfig::default()
            },
            ..RepairConfig::default()
        };
        let session = RepairSession::load(&oracle, SUM_PROBLEM, config).unwrap();
        let report = session.evolve().unwrap();
        assert!(!report.fixes.is_empty());
        assert_eq!(report.fixes[0].repaired, "foldl plus zero");
        assert_eq!(report.fixes[0].edits.len(), 1);
        assert!(report.generations >= 1);
        assert!(report.fitness_evaluations_cached > 0);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"repaired\":\"foldl plus zero\""));
    }

    #[test]
    fn test_session_synthesize_uses_problem_context() {
        // No properties: synthesis enumerates all well-typed fits.
        let source = "\
zero :: Int
zero = 0
plus :: Int -> Int -> Int
plus = (+)
target :: Int
target = zero
";
        let oracle = ReferenceOracle::new();
        let session =
            RepairSession::load(&oracle, source, RepairConfig::default()).unwrap();
        let ty = mender_ir::parse_type_text("Int").unwrap();
        let candidates = session.synthesize(&ty).unwrap();
        assert!(candidates.contains(&"zero".to_string()));
        assert!(candidates.contains(&"plus zero zero".to_string()));
    }
}
