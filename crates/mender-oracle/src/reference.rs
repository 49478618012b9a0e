//! The reference oracle: a working `CompilerOracle` for the target
//! language, backed by the in-crate type checker and interpreter.
//!
//! Checks compile to in-memory thunks (fuel-bounded), so the whole repair
//! pipeline runs without an external compiler. Per-source compile failures
//! become artifacts that classify as `AllFail` when run, never batch
//! errors, so one broken candidate cannot sink its siblings.

use std::sync::Arc;

use mender_ir::{parse_declarations, Binding, Expr, Property, Scheme, Type};
use mender_sandbox::{CheckSource, CheckThunk, CompiledCheck, ThunkOutcome, CANDIDATE_NAME};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::holefit::{direct_fits, refinement_fits};
use crate::oracle::{CompilerOracle, FitResponse, HoleyExpr, OracleConfig, OracleError};
use crate::propcheck::{check_scope, generable, run_trials};
use crate::typecheck::{default_to_int, infer, TypeEnv};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceOracle;

impl ReferenceOracle {
    pub fn new() -> ReferenceOracle {
        ReferenceOracle
    }
}

/// Context bindings as (name, scheme) fit candidates, in context order.
/// Bindings whose type cannot be determined contribute no fits.
fn fit_candidates(env: &TypeEnv, ctx: &[Binding]) -> Vec<(String, Scheme)> {
    ctx.iter()
        .filter_map(|b| {
            env.lookup(&b.name)
                .map(|scheme| (b.name.clone(), scheme.clone()))
        })
        .collect()
}

impl CompilerOracle for ReferenceOracle {
    fn fits_at_type(
        &self,
        cfg: &OracleConfig,
        ty: &Type,
        ctx: &[Binding],
    ) -> Result<FitResponse, OracleError> {
        let env = TypeEnv::with_context(ctx);
        let candidates = fit_candidates(&env, ctx);
        let direct = direct_fits(ty, &candidates);
        let refinements = if cfg.hole_level >= 1 {
            refinement_fits(ty, &candidates, cfg.max_refinement_args)
        } else {
            Vec::new()
        };
        Ok(FitResponse {
            direct,
            refinements,
        })
    }

    fn monomorphise(&self, _cfg: &OracleConfig, ty: &Type) -> Option<Type> {
        Some(default_to_int(ty))
    }

    fn compile_checks(
        &self,
        cfg: &OracleConfig,
        sources: &[CheckSource],
    ) -> Result<Vec<CompiledCheck>, OracleError> {
        Ok(sources
            .iter()
            .map(|s| CompiledCheck::Thunk(compile_one(cfg, s)))
            .collect())
    }

    fn holey_variants(
        &self,
        _cfg: &OracleConfig,
        target_text: &str,
    ) -> Result<Vec<HoleyExpr>, OracleError> {
        let target = mender_ir::parse_expr_text(target_text)?;
        let variants = target
            .subexpr_paths()
            .into_iter()
            .filter_map(|site| {
                target
                    .replace_at(&site, &Expr::Hole)
                    .map(|expr| HoleyExpr { expr, site })
            })
            .collect();
        Ok(variants)
    }

    fn hole_fits(
        &self,
        _cfg: &OracleConfig,
        holey: &HoleyExpr,
        target_type: &Type,
        ctx: &[Binding],
    ) -> Result<Vec<Expr>, OracleError> {
        let env = TypeEnv::with_context(ctx);
        let anchored = Expr::Ascribe(Box::new(holey.expr.clone()), target_type.clone());
        // An untypeable variant contributes no fits; it must not sink the
        // sibling sites.
        let holes = match infer(&env, &anchored) {
            Ok((_, holes)) => holes,
            Err(e) => {
                debug!(site = %holey.site, error = %e, "holey variant does not typecheck");
                return Ok(Vec::new());
            }
        };
        let info = match holes.first() {
            Some(info) => info,
            None => return Ok(Vec::new()),
        };

        // Locals first (innermost scope order), then context bindings not
        // shadowed by a local.
        let mut candidates: Vec<(String, Scheme)> = info
            .locals
            .iter()
            .map(|(name, ty)| (name.clone(), Scheme::mono(ty.clone())))
            .collect();
        for (name, scheme) in fit_candidates(&env, ctx) {
            if !info.locals.iter().any(|(local, _)| *local == name) {
                candidates.push((name, scheme));
            }
        }

        Ok(direct_fits(&info.ty, &candidates))
    }

    fn parse_expr(&self, _cfg: &OracleConfig, text: &str) -> Result<Expr, OracleError> {
        Ok(mender_ir::parse_expr_text(text)?)
    }
}

/// A check compiled against the interpreter. Evaluation is bounded by the
/// per-trial fuel, so an abandoned watchdog thread always finishes.
struct CompiledPropsCheck {
    scope: Vec<(String, Expr)>,
    /// Per property: the applied head expression and the generated
    /// argument types.
    props: Vec<(Expr, Vec<Type>)>,
    trials: u32,
    fuel: u64,
    seed: u64,
    /// Set when compilation failed; evaluation reports it instead.
    failure: Option<CompileFailure>,
}

enum CompileFailure {
    Crashed(String),
    WrongShape,
}

fn failed(reason: CompileFailure) -> Arc<CompiledPropsCheck> {
    Arc::new(CompiledPropsCheck {
        scope: Vec::new(),
        props: Vec::new(),
        trials: 0,
        fuel: 0,
        seed: 0,
        failure: Some(reason),
    })
}

fn compile_one(cfg: &OracleConfig, source: &CheckSource) -> Arc<dyn CheckThunk> {
    let decls = match parse_declarations(&source.text) {
        Ok(decls) => decls,
        Err(e) => {
            debug!(error = %e, "check source failed to parse");
            return failed(CompileFailure::Crashed(e.to_string()));
        }
    };
    if decls.binding(CANDIDATE_NAME).is_none() {
        return failed(CompileFailure::WrongShape);
    }

    let env = {
        let mut env = TypeEnv::with_context(&decls.bindings);
        for p in &decls.properties {
            if let Some(scheme) = &p.scheme {
                env.insert(&p.name, scheme.clone());
            }
        }
        env
    };

    let mut props = Vec::new();
    for p in &decls.properties {
        match prop_plan(&env, p) {
            Ok(plan) => props.push(plan),
            Err(e) => {
                debug!(prop = %p.name, error = %e, "property failed to compile");
                return failed(CompileFailure::Crashed(e.to_string()));
            }
        }
    }

    Arc::new(CompiledPropsCheck {
        scope: check_scope(&decls.bindings, &decls.properties),
        props,
        trials: cfg.check_trials,
        fuel: cfg.check_fuel,
        seed: cfg.seed,
        failure: None,
    })
}

/// Work out how a property is invoked: applied to the candidate, then to
/// generated arguments of the remaining parameter types.
fn prop_plan(env: &TypeEnv, prop: &Property) -> Result<(Expr, Vec<Type>), OracleError> {
    if prop.params.is_empty() {
        return Ok((prop.body.clone(), Vec::new()));
    }

    let scheme = match &prop.scheme {
        Some(scheme) => scheme.clone(),
        None => {
            let (ty, _) = infer(env, &prop.as_lambda())?;
            Scheme::mono(ty)
        }
    };
    let (arg_types, ret) = scheme.ty.uncurry();
    if ret != &Type::Bool && !matches!(ret, Type::Var(_)) {
        return Err(OracleError::CheckCompile(format!(
            "property {} does not return Bool",
            prop.name
        )));
    }
    if arg_types.len() < prop.params.len() {
        return Err(OracleError::CheckCompile(format!(
            "property {} has more parameters than its type",
            prop.name
        )));
    }

    let generated: Vec<Type> = arg_types[1..prop.params.len()]
        .iter()
        .map(|t| default_to_int(t))
        .collect();
    if let Some(bad) = generated.iter().find(|t| !generable(t)) {
        return Err(OracleError::CheckCompile(format!(
            "property {} needs an argument of ungenerable type {bad}",
            prop.name
        )));
    }

    let applied = Expr::app(Expr::var(&prop.name), Expr::var(CANDIDATE_NAME));
    Ok((applied, generated))
}

impl CheckThunk for CompiledPropsCheck {
    fn eval(&self) -> ThunkOutcome {
        match &self.failure {
            Some(CompileFailure::Crashed(msg)) => return ThunkOutcome::Crashed(msg.clone()),
            Some(CompileFailure::WrongShape) => return ThunkOutcome::WrongShape,
            None => {}
        }

        let mut bits = Vec::with_capacity(self.props.len());
        for (index, (applied, arg_types)) in self.props.iter().enumerate() {
            // Per-property seeding, so property order never perturbs the
            // generated inputs of its neighbours.
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(index as u64));
            match run_trials(
                &self.scope,
                applied,
                arg_types,
                self.trials,
                self.fuel,
                &mut rng,
            ) {
                Ok(passed) => bits.push(passed),
                Err(e) if e.is_nontermination() => return ThunkOutcome::NonTermination,
                Err(e) => return ThunkOutcome::Crashed(e.to_string()),
            }
        }
        ThunkOutcome::Bits(bits)
    }
}
