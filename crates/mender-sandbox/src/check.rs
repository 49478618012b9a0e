//! The check builder — renders a candidate and a property list into a
//! compilable check source.
//!
//! A check source is a problem-format document: the context bindings, a
//! `candidate` binding ascribed with the target type, and the property
//! bindings in property order. Compiling it yields an artifact that applies
//! the randomized checker to each property independently (fixed trial
//! count, no shrinking, silent) and collects the success booleans into a
//! vector whose order equals the property order.

use std::fmt::Write;

use mender_ir::Problem;

/// The binding name every check source gives the candidate under test.
pub const CANDIDATE_NAME: &str = "candidate";

/// A renderable, compilable check for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSource {
    pub text: String,
}

/// Build the check source for one candidate expression rendering.
pub fn build_check_source(problem: &Problem, candidate: &str) -> CheckSource {
    let mut text = String::new();
    for binding in &problem.context {
        let _ = writeln!(text, "{binding}");
    }
    let _ = writeln!(text, "{CANDIDATE_NAME} :: {}", problem.target_type);
    let _ = writeln!(text, "{CANDIDATE_NAME} = {candidate}");
    for property in &problem.properties {
        let _ = writeln!(text, "{property}");
    }
    CheckSource { text }
}

/// Build one check source per candidate, preserving candidate order.
pub fn build_check_sources(problem: &Problem, candidates: &[String]) -> Vec<CheckSource> {
    candidates
        .iter()
        .map(|c| build_check_source(problem, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_ir::parse_problem;

    fn sample_problem() -> Problem {
        parse_problem(
            "\
zero :: Int
zero = 0
plus :: Int -> Int -> Int
plus = (+)
target :: [Int] -> Int
target = foldl plus zero
prop_isSum :: ([Int] -> Int) -> [Int] -> Bool
prop_isSum f xs = f xs == sum xs
prop_empty :: ([Int] -> Int) -> Bool
prop_empty f = f [] == 0
",
        )
        .unwrap()
    }

    #[test]
    fn test_check_source_shape() {
        let problem = sample_problem();
        let check = build_check_source(&problem, "foldl plus zero");
        assert!(check.text.contains("candidate :: [Int] -> Int"));
        assert!(check.text.contains("candidate = foldl plus zero"));
        // Context precedes the candidate, properties follow it in order.
        let zero_at = check.text.find("zero = 0").unwrap();
        let cand_at = check.text.find("candidate =").unwrap();
        let p1_at = check.text.find("prop_isSum f xs").unwrap();
        let p2_at = check.text.find("prop_empty f").unwrap();
        assert!(zero_at < cand_at && cand_at < p1_at && p1_at < p2_at);
    }

    #[test]
    fn test_sources_per_candidate_in_order() {
        let problem = sample_problem();
        let candidates = vec!["foldl plus zero".to_string(), "sum".to_string()];
        let checks = build_check_sources(&problem, &candidates);
        assert_eq!(checks.len(), 2);
        assert!(checks[0].text.contains("candidate = foldl plus zero"));
        assert!(checks[1].text.contains("candidate = sum"));
    }

    #[test]
    fn test_check_source_reparses_as_problem_context() {
        // The check source must itself be a parseable document so
        // interpreter-backed oracles can load it directly.
        let problem = sample_problem();
        let check = build_check_source(&problem, "foldl plus zero");
        // It has no `target` binding, but every declaration must lex/parse.
        for line in check.text.lines().filter(|l| !l.trim().is_empty()) {
            assert!(
                mender_ir::parse_expr_text(line.split(" = ").last().unwrap()).is_ok()
                    || line.contains("::"),
                "unparseable check line: {line}"
            );
        }
    }
}
