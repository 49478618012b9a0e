//! The compiler-oracle interface.
//!
//! The search layers never talk to a compiler directly; they go through
//! this trait, so the engine runs identically against the in-crate
//! reference oracle and against an external compiler. This is the same
//! seam discipline as an executor trait between an engine and its backend.

use mender_ir::{Binding, Expr, SitePath, Type};
use mender_sandbox::{CheckSource, CompiledCheck};
use serde::{Deserialize, Serialize};

use crate::typecheck::TypeError;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("parse error: {0}")]
    Parse(#[from] mender_ir::ParseError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("check compilation failed: {0}")]
    CheckCompile(String),
}

/// Oracle-side knobs. Part of every memo key: two calls with different
/// configs are different subproblems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Maximum hole-nesting level for refinement fits (0 = direct only).
    pub hole_level: i64,
    /// Cap on sub-holes per refinement skeleton.
    pub max_refinement_args: usize,
    /// Randomized trials per property check.
    pub check_trials: u32,
    /// Evaluator fuel per trial.
    pub check_fuel: u64,
    /// Seed for the randomized checker.
    pub seed: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            hole_level: 2,
            max_refinement_args: 3,
            check_trials: 100,
            check_fuel: 500_000,
            seed: 42,
        }
    }
}

impl OracleConfig {
    /// This config with a different hole level.
    pub fn at_level(&self, hole_level: i64) -> OracleConfig {
        OracleConfig {
            hole_level,
            ..self.clone()
        }
    }
}

/// A refinement fit: a skeleton expression containing holes, with the
/// ordered types its sub-holes still need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    pub skeleton: Expr,
    pub sub_hole_types: Vec<Type>,
}

/// The oracle's answer for a hole at a requested type: direct value fits
/// and (at hole level >= 1) refinement skeletons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FitResponse {
    pub direct: Vec<Expr>,
    pub refinements: Vec<Refinement>,
}

/// A rewrite of a program where exactly one subexpression has been replaced
/// by a hole, tagged with the site it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleyExpr {
    pub expr: Expr,
    pub site: SitePath,
}

/// The compiler oracle consumed by the search layers.
pub trait CompilerOracle {
    /// Fits for a hole of `ty` in `ctx`: direct expressions, plus
    /// refinement skeletons when `cfg.hole_level >= 1`.
    fn fits_at_type(
        &self,
        cfg: &OracleConfig,
        ty: &Type,
        ctx: &[Binding],
    ) -> Result<FitResponse, OracleError>;

    /// Pin `ty` down to a concrete type, if possible.
    fn monomorphise(&self, cfg: &OracleConfig, ty: &Type) -> Option<Type>;

    /// Compile check sources into runnable artifacts, one per source, in
    /// source order. Per-source compile failures must surface as artifacts
    /// whose run classifies as `AllFail`, not as an `Err`.
    fn compile_checks(
        &self,
        cfg: &OracleConfig,
        sources: &[CheckSource],
    ) -> Result<Vec<CompiledCheck>, OracleError>;

    /// Every rewrite of `target_text` with one subexpression replaced by a
    /// hole, in preorder site order.
    fn holey_variants(
        &self,
        cfg: &OracleConfig,
        target_text: &str,
    ) -> Result<Vec<HoleyExpr>, OracleError>;

    /// Direct fits for the unique hole of `holey`, typed against
    /// `target_type`, drawing on `ctx` and the locals in scope at the hole.
    fn hole_fits(
        &self,
        cfg: &OracleConfig,
        holey: &HoleyExpr,
        target_type: &Type,
        ctx: &[Binding],
    ) -> Result<Vec<Expr>, OracleError>;

    fn parse_expr(&self, cfg: &OracleConfig, text: &str) -> Result<Expr, OracleError>;

    /// Substitute the unique hole of `holey`.
    fn fill_hole(&self, holey: &HoleyExpr, fill: &Expr) -> Option<Expr> {
        holey.expr.fill_holes(&[fill.clone()])
    }
}
