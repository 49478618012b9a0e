//! Randomized property checking.
//!
//! Each property is applied to the candidate and then to generated
//! arguments, a fixed number of trials, no shrinking, silent. Argument
//! generation is type-directed and deterministic from the seed. A crashing
//! trial fails the property; a non-terminating trial aborts the whole check
//! as non-termination (the sandbox reports it as a timeout).

use mender_ir::{Expr, Literal, Property, Type};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::eval::{Env, EvalError, Evaluator, Value};

const INT_RANGE: std::ops::RangeInclusive<i64> = -20..=20;
const MAX_LIST_LEN: usize = 8;

/// Generate a literal expression of `ty`. Function types cannot be
/// generated; callers reject them at compile time.
pub fn generate_arg(rng: &mut ChaCha8Rng, ty: &Type) -> Expr {
    match ty {
        Type::Int | Type::Var(_) => Expr::Lit(Literal::Int(rng.gen_range(INT_RANGE))),
        Type::Bool => Expr::Lit(Literal::Bool(rng.gen())),
        Type::List(elem) => {
            let len = rng.gen_range(0..=MAX_LIST_LEN);
            Expr::ListLit((0..len).map(|_| generate_arg(rng, elem)).collect())
        }
        Type::Fun(_, _) => Expr::Hole,
    }
}

/// Whether arguments of `ty` can be generated.
pub fn generable(ty: &Type) -> bool {
    match ty {
        Type::Int | Type::Bool | Type::Var(_) => true,
        Type::List(elem) => generable(elem),
        Type::Fun(_, _) => false,
    }
}

/// Run the trials for one property against the candidate binding.
///
/// `bindings` is the full recursive scope of the check (context, candidate,
/// properties); `applied` is the property already applied to the candidate;
/// `arg_types` are the types of the remaining, generated parameters.
/// Returns whether every trial passed. Only non-termination propagates as
/// an error; any other evaluation failure fails the trial.
pub fn run_trials(
    bindings: &[(String, Expr)],
    applied: &Expr,
    arg_types: &[Type],
    trials: u32,
    fuel: u64,
    rng: &mut ChaCha8Rng,
) -> Result<bool, EvalError> {
    let trials = if arg_types.is_empty() { 1 } else { trials };
    for _ in 0..trials {
        let args: Vec<Expr> = arg_types.iter().map(|t| generate_arg(rng, t)).collect();
        let call = Expr::apply(applied.clone(), args);

        let evaluator = Evaluator::new(fuel);
        let env = Env::base().extend_recursive(bindings);
        match evaluator.eval(&call, &env) {
            Ok(Value::Bool(true)) => {}
            Ok(_) => return Ok(false),
            Err(e) if e.is_nontermination() => return Err(e),
            Err(_) => return Ok(false),
        }
    }
    Ok(true)
}

/// The full recursive scope of a check document: plain bindings plus each
/// property as a function value.
pub fn check_scope(
    bindings: &[mender_ir::Binding],
    properties: &[Property],
) -> Vec<(String, Expr)> {
    let mut scope: Vec<(String, Expr)> = bindings
        .iter()
        .map(|b| (b.name.clone(), b.expr.clone()))
        .collect();
    for p in properties {
        scope.push((p.name.clone(), p.as_lambda()));
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_ir::{parse_expr_text, parse_type_text};
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_generation_is_deterministic() {
        let ty = parse_type_text("[Int]").unwrap();
        let a: Vec<Expr> = {
            let mut r = rng();
            (0..10).map(|_| generate_arg(&mut r, &ty)).collect()
        };
        let b: Vec<Expr> = {
            let mut r = rng();
            (0..10).map(|_| generate_arg(&mut r, &ty)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_generable() {
        assert!(generable(&parse_type_text("[[Int]]").unwrap()));
        assert!(generable(&Type::Bool));
        assert!(!generable(&parse_type_text("Int -> Int").unwrap()));
    }

    #[test]
    fn test_trials_pass_and_fail() {
        let bindings = vec![(
            "candidate".to_string(),
            parse_expr_text("foldl (+) 0").unwrap(),
        )];
        let applied = parse_expr_text("\\xs -> candidate xs == sum xs").unwrap();
        let list_ty = parse_type_text("[Int]").unwrap();

        let ok = run_trials(
            &bindings,
            &applied,
            std::slice::from_ref(&list_ty),
            50,
            200_000,
            &mut rng(),
        )
        .unwrap();
        assert!(ok);

        let wrong = vec![(
            "candidate".to_string(),
            parse_expr_text("foldl (-) 0").unwrap(),
        )];
        let ok = run_trials(
            &wrong,
            &applied,
            std::slice::from_ref(&list_ty),
            50,
            200_000,
            &mut rng(),
        )
        .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_crashing_trial_fails_property() {
        let applied = parse_expr_text("\\x -> head [] == x").unwrap();
        let ok = run_trials(&[], &applied, &[Type::Int], 5, 10_000, &mut rng()).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_divergence_propagates() {
        let bindings = vec![("spin".to_string(), parse_expr_text("let x = x in x").unwrap())];
        let applied = parse_expr_text("\\y -> spin == y").unwrap();
        let err = run_trials(&bindings, &applied, &[Type::Int], 5, 10_000, &mut rng())
            .unwrap_err();
        assert!(err.is_nontermination());
    }

    #[test]
    fn test_property_without_extra_args_runs_once() {
        // Deterministic property: a single trial decides it.
        let bindings = vec![(
            "candidate".to_string(),
            parse_expr_text("\\x -> x + 1").unwrap(),
        )];
        let applied = parse_expr_text("candidate 1 == 2").unwrap();
        assert!(run_trials(&bindings, &applied, &[], 100, 10_000, &mut rng()).unwrap());
    }
}
