//! Batch property checking: candidates in, verdicts out, order preserved.
//!
//! This is the bridge between the oracle (which compiles check sources)
//! and the sandbox (which runs them). Oracle failures are absorbed as
//! `AllFail` so the search never stops on a broken candidate.

use mender_ir::Problem;
use mender_sandbox::{build_check_sources, CheckRunner, Verdict};
use mender_oracle::{CompilerOracle, OracleConfig};
use tracing::warn;

use crate::fix::EFix;

/// Check each candidate rendering against the problem's properties.
/// The verdict vector preserves candidate order.
pub fn check_candidates<O: CompilerOracle>(
    oracle: &O,
    cfg: &OracleConfig,
    runner: &CheckRunner,
    problem: &Problem,
    candidates: &[String],
) -> Vec<Verdict> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let sources = build_check_sources(problem, candidates);
    match oracle.compile_checks(cfg, &sources) {
        Ok(checks) => {
            let mut verdicts = runner.run_all(&checks);
            // A misbehaving oracle may return the wrong count; keep the
            // vector aligned with the candidates either way.
            verdicts.truncate(candidates.len());
            while verdicts.len() < candidates.len() {
                verdicts.push(Verdict::AllFail);
            }
            verdicts
        }
        Err(e) => {
            warn!(error = %e, "check compilation failed for the whole batch");
            vec![Verdict::AllFail; candidates.len()]
        }
    }
}

/// Apply each fix to the problem's target and check the results.
pub fn check_fixes<O: CompilerOracle>(
    oracle: &O,
    cfg: &OracleConfig,
    runner: &CheckRunner,
    problem: &Problem,
    fixes: &[EFix],
) -> Vec<Verdict> {
    let candidates: Vec<String> = fixes
        .iter()
        .map(|f| f.apply(&problem.target).to_string())
        .collect();
    check_candidates(oracle, cfg, runner, problem, &candidates)
}
