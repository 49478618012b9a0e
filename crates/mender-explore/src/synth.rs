//! Candidate synthesis: well-typed expressions of a requested type,
//! recursively expanded through refinement skeletons and filtered by
//! property checks.
//!
//! Results are memoized by the full input key (oracle config, depth,
//! context, type, properties); a repeated call returns the cached sequence
//! without touching the oracle.

use std::collections::HashMap;
use std::sync::Mutex;

use mender_ir::{Binding, Expr, Problem, Property, Type};
use mender_oracle::{CompilerOracle, OracleConfig, Refinement};
use mender_sandbox::{CheckRunner, SandboxConfig};
use tracing::{debug, warn};

use crate::checks::check_candidates;
use crate::SearchError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    config: OracleConfig,
    depth: i64,
    context: String,
    ty: String,
    props: String,
}

impl MemoKey {
    fn new(
        config: OracleConfig,
        depth: i64,
        ctx: &[Binding],
        props: &[Property],
        ty: &Type,
    ) -> MemoKey {
        let context = ctx
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let props = props
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        MemoKey {
            config,
            depth,
            context,
            props,
            ty: ty.to_string(),
        }
    }
}

pub struct Synthesizer<'a, O: CompilerOracle> {
    oracle: &'a O,
    cfg: OracleConfig,
    runner: CheckRunner,
    memo: Mutex<HashMap<MemoKey, Vec<String>>>,
}

impl<'a, O: CompilerOracle> Synthesizer<'a, O> {
    pub fn new(oracle: &'a O, cfg: OracleConfig, sandbox: SandboxConfig) -> Self {
        Synthesizer {
            oracle,
            cfg,
            runner: CheckRunner::new(sandbox),
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Synthesize candidates of `ty` in `ctx` satisfying `props`, searching
    /// `depth` levels of nested holes. With no properties, returns all
    /// well-typed fits without executing anything.
    pub fn synthesize(
        &self,
        depth: i64,
        ctx: &[Binding],
        props: &[Property],
        ty: &Type,
    ) -> Result<Vec<String>, SearchError> {
        self.synth_at(self.cfg.hole_level, depth, ctx, props, ty)
    }

    fn synth_at(
        &self,
        level: i64,
        depth: i64,
        ctx: &[Binding],
        props: &[Property],
        ty: &Type,
    ) -> Result<Vec<String>, SearchError> {
        if depth < 0 {
            return Ok(Vec::new());
        }
        let cfg = self.cfg.at_level(level);
        let key = MemoKey::new(cfg.clone(), depth, ctx, props, ty);
        if let Some(cached) = self.memo.lock().unwrap().get(&key) {
            return Ok(cached.clone());
        }

        let ty = match self.oracle.monomorphise(&cfg, ty) {
            Some(mono) => mono,
            None if props.is_empty() => ty.clone(),
            None => {
                warn!(%ty, "type cannot be monomorphized; property checks are impossible");
                self.memo.lock().unwrap().insert(key, Vec::new());
                return Ok(Vec::new());
            }
        };

        let fits = self.oracle.fits_at_type(&cfg, &ty, ctx)?;
        let mut candidates: Vec<String> =
            fits.direct.iter().map(|e| e.to_string()).collect();
        for refinement in &fits.refinements {
            candidates.extend(self.expand_refinement(refinement, depth, ctx)?);
        }
        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));

        if props.is_empty() {
            self.memo.lock().unwrap().insert(key, candidates.clone());
            return Ok(candidates);
        }

        // Ad-hoc problem record carrying the context and properties the
        // checks need; the candidate itself is bound by the check source.
        let problem = Problem {
            target: Expr::Hole,
            target_type: ty.clone(),
            properties: props.to_vec(),
            context: ctx.to_vec(),
        };
        let verdicts =
            check_candidates(self.oracle, &cfg, &self.runner, &problem, &candidates);
        let survivors: Vec<String> = candidates
            .into_iter()
            .zip(&verdicts)
            .filter(|(_, v)| v.is_pass())
            .map(|(c, _)| c)
            .collect();
        debug!(
            %ty,
            total = verdicts.len(),
            passing = survivors.len(),
            "synthesis candidates checked"
        );
        self.memo.lock().unwrap().insert(key, survivors.clone());
        Ok(survivors)
    }

    /// Fill a refinement skeleton's sub-holes with recursively synthesized
    /// fits and enumerate the Cartesian product. A sub-hole with no fits
    /// drops the whole skeleton.
    fn expand_refinement(
        &self,
        refinement: &Refinement,
        depth: i64,
        ctx: &[Binding],
    ) -> Result<Vec<String>, SearchError> {
        // The last depth level queries at hole level 0; above it, level 1.
        let child_level = if depth - 1 <= 0 { 0 } else { 1 };
        let mut per_hole: Vec<Vec<Expr>> = Vec::with_capacity(refinement.sub_hole_types.len());
        for sub_ty in &refinement.sub_hole_types {
            let sub_ty = self
                .oracle
                .monomorphise(&self.cfg, sub_ty)
                .unwrap_or_else(|| sub_ty.clone());
            let fills = self.synth_at(child_level, depth - 1, ctx, &[], &sub_ty)?;
            if fills.is_empty() {
                return Ok(Vec::new());
            }
            let mut parsed = Vec::with_capacity(fills.len());
            for fill in &fills {
                parsed.push(self.oracle.parse_expr(&self.cfg, fill)?);
            }
            per_hole.push(parsed);
        }

        let mut out = Vec::new();
        let mut odometer = vec![0usize; per_hole.len()];
        loop {
            let fills: Vec<Expr> = odometer
                .iter()
                .zip(&per_hole)
                .map(|(&i, fits)| fits[i].clone())
                .collect();
            if let Some(filled) = refinement.skeleton.fill_holes(&fills) {
                out.push(filled.to_string());
            }
            // Advance the odometer; done when it wraps.
            let mut pos = per_hole.len();
            loop {
                if pos == 0 {
                    return Ok(out);
                }
                pos -= 1;
                odometer[pos] += 1;
                if odometer[pos] < per_hole[pos].len() {
                    break;
                }
                odometer[pos] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use mender_ir::{parse_problem, parse_type_text};
    use mender_oracle::{FitResponse, HoleyExpr, OracleError, ReferenceOracle};
    use mender_sandbox::{CheckSource, CompiledCheck};

    /// Delegating oracle that counts every call, for memo-soundness tests.
    struct CountingOracle {
        inner: ReferenceOracle,
        calls: Cell<usize>,
    }

    impl CountingOracle {
        fn new() -> Self {
            CountingOracle {
                inner: ReferenceOracle::new(),
                calls: Cell::new(0),
            }
        }

        fn bump(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    impl CompilerOracle for CountingOracle {
        fn fits_at_type(
            &self,
            cfg: &OracleConfig,
            ty: &Type,
            ctx: &[Binding],
        ) -> Result<FitResponse, OracleError> {
            self.bump();
            self.inner.fits_at_type(cfg, ty, ctx)
        }

        fn monomorphise(&self, cfg: &OracleConfig, ty: &Type) -> Option<Type> {
            self.bump();
            self.inner.monomorphise(cfg, ty)
        }

        fn compile_checks(
            &self,
            cfg: &OracleConfig,
            sources: &[CheckSource],
        ) -> Result<Vec<CompiledCheck>, OracleError> {
            self.bump();
            self.inner.compile_checks(cfg, sources)
        }

        fn holey_variants(
            &self,
            cfg: &OracleConfig,
            text: &str,
        ) -> Result<Vec<HoleyExpr>, OracleError> {
            self.bump();
            self.inner.holey_variants(cfg, text)
        }

        fn hole_fits(
            &self,
            cfg: &OracleConfig,
            holey: &HoleyExpr,
            target_type: &Type,
            ctx: &[Binding],
        ) -> Result<Vec<Expr>, OracleError> {
            self.bump();
            self.inner.hole_fits(cfg, holey, target_type, ctx)
        }

        fn parse_expr(&self, cfg: &OracleConfig, text: &str) -> Result<Expr, OracleError> {
            self.bump();
            self.inner.parse_expr(cfg, text)
        }
    }

    fn arith_context() -> Vec<Binding> {
        parse_problem(
            "\
zero :: Int
zero = 0
one :: Int
one = 1
add :: Int -> Int -> Int
add = (+)
target :: Int
target = zero
",
        )
        .unwrap()
        .context
    }

    #[test]
    fn test_negative_depth_is_empty_without_oracle_calls() {
        let oracle = CountingOracle::new();
        let synth = Synthesizer::new(&oracle, OracleConfig::default(), SandboxConfig::default());
        let out = synth
            .synthesize(-1, &arith_context(), &[], &Type::Int)
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(oracle.calls.get(), 0);
    }

    #[test]
    fn test_property_free_synthesis_includes_compositions() {
        let oracle = ReferenceOracle::new();
        let synth = Synthesizer::new(&oracle, OracleConfig::default(), SandboxConfig::default());
        let out = synth
            .synthesize(1, &arith_context(), &[], &Type::Int)
            .unwrap();
        assert!(out.contains(&"zero".to_string()));
        assert!(out.contains(&"one".to_string()));
        assert!(out.contains(&"add zero one".to_string()));
    }

    #[test]
    fn test_memoization_soundness() {
        let oracle = CountingOracle::new();
        let synth = Synthesizer::new(&oracle, OracleConfig::default(), SandboxConfig::default());
        let ctx = arith_context();
        let first = synth.synthesize(1, &ctx, &[], &Type::Int).unwrap();
        let calls_after_first = oracle.calls.get();
        assert!(calls_after_first > 0);

        let second = synth.synthesize(1, &ctx, &[], &Type::Int).unwrap();
        assert_eq!(first, second, "result sequences must be identical");
        assert_eq!(
            oracle.calls.get(),
            calls_after_first,
            "second call must not invoke the oracle"
        );
    }

    #[test]
    fn test_cartesian_completeness() {
        // `add _ _` with two Int fits per hole: exactly 2 * 2 expansions.
        let oracle = ReferenceOracle::new();
        let cfg = OracleConfig {
            hole_level: 1,
            ..OracleConfig::default()
        };
        let synth = Synthesizer::new(&oracle, cfg, SandboxConfig::default());
        let out = synth
            .synthesize(1, &arith_context(), &[], &Type::Int)
            .unwrap();
        let add_forms: Vec<&String> =
            out.iter().filter(|c| c.starts_with("add ")).collect();
        assert_eq!(add_forms.len(), 4);
        for a in ["zero", "one"] {
            for b in ["zero", "one"] {
                assert!(out.contains(&format!("add {a} {b}")));
            }
        }
    }

    #[test]
    fn test_no_fits_drops_skeleton() {
        // Context with a function whose argument type has no fits at all.
        let ctx = parse_problem(
            "\
want :: Bool -> Int
want b = 1
target :: Int
target = 0
",
        )
        .unwrap()
        .context;
        let oracle = ReferenceOracle::new();
        let synth = Synthesizer::new(&oracle, OracleConfig::default(), SandboxConfig::default());
        let out = synth.synthesize(1, &ctx, &[], &Type::Int).unwrap();
        // `want _` would need a Bool fit; there is none, so the skeleton
        // contributes nothing.
        assert!(out.iter().all(|c| !c.starts_with("want ")));
    }

    #[test]
    fn test_synthesis_with_properties_filters() {
        let problem = parse_problem(
            "\
zero :: Int
zero = 0
add :: Int -> Int -> Int
add = (+)
foldl' :: (b -> a -> b) -> b -> [a] -> b
foldl' = foldl
target :: [Int] -> Int
target = foldl' add zero
prop_is_sum :: ([Int] -> Int) -> Bool
prop_is_sum f = f [1, 2, 3] == 6
",
        )
        .unwrap();
        let oracle = ReferenceOracle::new();
        let synth = Synthesizer::new(&oracle, OracleConfig::default(), SandboxConfig::default());
        let out = synth
            .synthesize(
                1,
                &problem.context,
                &problem.properties,
                &parse_type_text("[Int] -> Int").unwrap(),
            )
            .unwrap();
        assert!(
            out.contains(&"foldl' add zero".to_string()),
            "expected the summing fold among {out:?}"
        );
    }
}
