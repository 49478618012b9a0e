//! Hole-fit enumeration.
//!
//! Direct fits are named values whose instantiated type unifies with the
//! hole type. Refinement fits apply a function candidate to fresh holes
//! when the partial application's result unifies, producing skeletons for
//! the synthesizer to expand.

use mender_ir::{Expr, Scheme, Type};

use crate::oracle::Refinement;
use crate::typecheck::{fits, Unifier};

/// Direct fits for `wanted` among `candidates`, preserving candidate order.
pub fn direct_fits(wanted: &Type, candidates: &[(String, Scheme)]) -> Vec<Expr> {
    candidates
        .iter()
        .filter(|(_, scheme)| fits(scheme, wanted))
        .map(|(name, _)| Expr::var(name))
        .collect()
}

/// Refinement fits for `wanted`: each candidate applied to 1..=`max_args`
/// holes, kept when the result type unifies. Sub-hole types are reported
/// as solved by the unification (they may still contain variables; the
/// synthesizer monomorphizes before recursing).
pub fn refinement_fits(
    wanted: &Type,
    candidates: &[(String, Scheme)],
    max_args: usize,
) -> Vec<Refinement> {
    let mut out = Vec::new();
    for (name, scheme) in candidates {
        for arg_count in 1..=max_args {
            let mut uni = Unifier::new();
            let inst = uni.instantiate(scheme);
            let arg_vars: Vec<Type> = (0..arg_count).map(|_| uni.fresh()).collect();
            let result = uni.fresh();
            let shape = arg_vars
                .iter()
                .rev()
                .fold(result.clone(), |acc, a| Type::fun(a.clone(), acc));
            if uni.unify(&inst, &shape).is_err() {
                // More arguments than the candidate accepts; stop peeling.
                break;
            }
            if uni.unify(&result, wanted).is_err() {
                continue;
            }
            let skeleton = Expr::apply(
                Expr::var(name),
                std::iter::repeat(Expr::Hole).take(arg_count).collect(),
            );
            let sub_hole_types = arg_vars.iter().map(|a| uni.zonk(a)).collect();
            out.push(Refinement {
                skeleton,
                sub_hole_types,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_ir::parse_type_text;

    fn scheme(sig: &str) -> Scheme {
        Scheme::generalize(parse_type_text(sig).unwrap())
    }

    fn sample_candidates() -> Vec<(String, Scheme)> {
        vec![
            ("zero".to_string(), scheme("Int")),
            ("one".to_string(), scheme("Int")),
            ("add".to_string(), scheme("Int -> Int -> Int")),
            ("foldl".to_string(), scheme("(b -> a -> b) -> b -> [a] -> b")),
        ]
    }

    #[test]
    fn test_direct_fits_by_type() {
        let fits = direct_fits(&Type::Int, &sample_candidates());
        let names: Vec<String> = fits.iter().map(|e| e.to_string()).collect();
        assert_eq!(names, vec!["zero", "one"]);
    }

    #[test]
    fn test_direct_fits_polymorphic() {
        let wanted = parse_type_text("[Int] -> Int").unwrap();
        let fits = direct_fits(&wanted, &sample_candidates());
        // Nothing matches directly: foldl needs two more arguments.
        assert!(fits.is_empty());
    }

    #[test]
    fn test_refinement_fits_int() {
        let refinements = refinement_fits(&Type::Int, &sample_candidates(), 3);
        let skeletons: Vec<String> =
            refinements.iter().map(|r| r.skeleton.to_string()).collect();
        // `add _` is Int -> Int, not Int; only the saturated form fits.
        assert!(skeletons.contains(&"add _ _".to_string()));
        assert!(!skeletons.contains(&"add _".to_string()));
        for r in &refinements {
            if r.skeleton.to_string() == "add _ _" {
                assert_eq!(r.sub_hole_types, vec![Type::Int, Type::Int]);
            }
        }
    }

    #[test]
    fn test_refinement_fits_function_result() {
        // foldl applied to two holes has type [a] -> b, which fits
        // [Int] -> Int with a := Int, b := Int.
        let wanted = parse_type_text("[Int] -> Int").unwrap();
        let refinements = refinement_fits(&wanted, &sample_candidates(), 3);
        let found = refinements
            .iter()
            .find(|r| r.skeleton.to_string() == "foldl _ _")
            .expect("foldl skeleton");
        assert_eq!(
            found.sub_hole_types,
            vec![
                parse_type_text("Int -> Int -> Int").unwrap(),
                Type::Int
            ]
        );
    }

    #[test]
    fn test_cartesian_counts_come_from_fit_counts() {
        // Two Int fits per hole of `add _ _` means 4 combinations; the
        // synthesizer owns the product, this just pins the factor counts.
        let refinements = refinement_fits(&Type::Int, &sample_candidates(), 2);
        let add = refinements
            .iter()
            .find(|r| r.skeleton.to_string() == "add _ _")
            .unwrap();
        let per_hole: Vec<usize> = add
            .sub_hole_types
            .iter()
            .map(|t| direct_fits(t, &sample_candidates()).len())
            .collect();
        assert_eq!(per_hole, vec![2, 2]);
    }
}
