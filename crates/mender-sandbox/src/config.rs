use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the check sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock budget per check, in microseconds (default: 1 second).
    pub budget_micros: u64,
}

impl SandboxConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_micros(self.budget_micros)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            budget_micros: 1_000_000,
        }
    }
}
