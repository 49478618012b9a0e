use mender_explore::GeneticConfig;
use mender_oracle::OracleConfig;
use mender_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("hole nesting level must be non-negative, got {0}")]
    NegativeHoles(i64),

    #[error("synthesis depth must be non-negative, got {0}")]
    NegativeDepth(i64),

    #[error("search configuration: {0}")]
    Search(String),
}

/// Top-level configuration of a repair session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Top-level hole nesting level for synthesis (default 2).
    pub holes: i64,
    /// Recursion depth for synthesis (default 1).
    pub depth: i64,
    /// Verbose tracing.
    pub debug: bool,
    /// Seed for every stochastic component.
    pub seed: u64,
    /// Randomized trials per property check.
    pub check_trials: u32,
    /// Evaluator fuel per trial (interpreter-backed oracles).
    pub check_fuel: u64,
    pub sandbox: SandboxConfig,
    pub genetic: GeneticConfig,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            holes: 2,
            depth: 1,
            debug: false,
            seed: 42,
            check_trials: 100,
            check_fuel: 500_000,
            sandbox: SandboxConfig::default(),
            genetic: GeneticConfig::default(),
        }
    }
}

impl RepairConfig {
    /// Validate once, before any search runs. Invalid values are fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.holes < 0 {
            return Err(ConfigError::NegativeHoles(self.holes));
        }
        if self.depth < 0 {
            return Err(ConfigError::NegativeDepth(self.depth));
        }
        self.genetic
            .validate()
            .map_err(|e| ConfigError::Search(e.to_string()))
    }

    /// The oracle-side view of this configuration.
    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            hole_level: self.holes,
            check_trials: self.check_trials,
            check_fuel: self.check_fuel,
            seed: self.seed,
            ..OracleConfig::default()
        }
    }
}
