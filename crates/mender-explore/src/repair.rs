//! The repair driver: treat a wrong expression as a hole in context and
//! filter well-typed replacements by property checks.
//!
//! `repair_attempt` is the single-step variant the genetic search builds
//! on: it returns every candidate fix with its raw verdict, unfiltered, so
//! fitness can be computed lazily over the whole search tree.

use mender_ir::Problem;
use mender_oracle::{CompilerOracle, OracleConfig};
use mender_sandbox::{CheckRunner, Verdict};
use tracing::debug;

use crate::checks::check_candidates;
use crate::fix::EFix;
use crate::SearchError;

/// All single-edit candidate fixes for the problem's target, each paired
/// with the verdict of checking the edited program.
pub fn repair_attempt<O: CompilerOracle>(
    oracle: &O,
    cfg: &OracleConfig,
    runner: &CheckRunner,
    problem: &Problem,
) -> Result<Vec<(EFix, Verdict)>, SearchError> {
    let target_text = problem.target.to_string();
    let holey = oracle.holey_variants(cfg, &target_text)?;

    let mut fixes = Vec::new();
    for variant in &holey {
        let fits = oracle.hole_fits(cfg, variant, &problem.target_type, &problem.context)?;
        let original = problem.target.at_path(&variant.site);
        for fit in fits {
            // Replacing a site with itself is not an edit.
            if original == Some(&fit) {
                continue;
            }
            fixes.push(EFix::single(variant.site.clone(), fit));
        }
    }

    let candidates: Vec<String> = fixes
        .iter()
        .map(|f| f.apply(&problem.target).to_string())
        .collect();
    let verdicts = check_candidates(oracle, cfg, runner, problem, &candidates);
    debug!(
        sites = holey.len(),
        candidates = fixes.len(),
        "repair attempt complete"
    );
    Ok(fixes.into_iter().zip(verdicts).collect())
}

/// Repair the problem's target: the canonical renderings of every edited
/// program whose properties all pass.
pub fn repair<O: CompilerOracle>(
    oracle: &O,
    cfg: &OracleConfig,
    runner: &CheckRunner,
    problem: &Problem,
) -> Result<Vec<String>, SearchError> {
    let attempt = repair_attempt(oracle, cfg, runner, problem)?;
    Ok(attempt
        .into_iter()
        .filter(|(_, verdict)| verdict.is_pass())
        .map(|(fix, _)| fix.apply(&problem.target).to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_ir::parse_problem;
    use mender_oracle::ReferenceOracle;
    use mender_sandbox::SandboxConfig;

    fn runner() -> CheckRunner {
        CheckRunner::new(SandboxConfig::default())
    }

    #[test]
    fn test_repair_fold_operator() {
        let problem = parse_problem(
            "\
zero :: Int
zero = 0
plus :: Int -> Int -> Int
plus = (+)
target :: [Int] -> Int
target = foldl (-) zero
prop_isSum :: ([Int] -> Int) -> [Int] -> Bool
prop_isSum f xs = f xs == sum xs
",
        )
        .unwrap();
        let oracle = ReferenceOracle::new();
        let fixed = repair(&oracle, &OracleConfig::default(), &runner(), &problem).unwrap();
        assert!(
            fixed.contains(&"foldl plus zero".to_string()),
            "expected the summing fold among {fixed:?}"
        );
    }

    #[test]
    fn test_repair_attempt_keeps_failing_candidates() {
        let problem = parse_problem(
            "\
zero :: Int
zero = 0
one :: Int
one = 1
two :: Int
two = 2
target :: Int
target = zero
prop_is_one :: Int -> Bool
prop_is_one x = x == 1
",
        )
        .unwrap();
        let oracle = ReferenceOracle::new();
        let attempt =
            repair_attempt(&oracle, &OracleConfig::default(), &runner(), &problem).unwrap();
        assert!(!attempt.is_empty());
        // Unfiltered: both passing and failing verdicts appear.
        assert!(attempt.iter().any(|(_, v)| v.is_pass()));
        assert!(attempt.iter().any(|(_, v)| !v.is_pass()));
        // The passing fix replaces the root with `one`.
        let (fix, _) = attempt.iter().find(|(_, v)| v.is_pass()).unwrap();
        assert_eq!(fix.apply(&problem.target).to_string(), "one");
    }

    #[test]
    fn test_no_op_edits_are_excluded() {
        let problem = parse_problem(
            "\
zero :: Int
zero = 0
target :: Int
target = zero
prop_zero :: Int -> Bool
prop_zero x = x == 0
",
        )
        .unwrap();
        let oracle = ReferenceOracle::new();
        let attempt =
            repair_attempt(&oracle, &OracleConfig::default(), &runner(), &problem).unwrap();
        // The only context fit for the root site is `zero` itself.
        assert!(attempt.is_empty());
    }
}
