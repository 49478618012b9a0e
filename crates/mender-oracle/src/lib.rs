//! Compiler-oracle interface and reference oracle for the mender repair
//! engine.
//!
//! The oracle answers three families of questions for the search layers:
//! which well-typed expressions fit a hole, which rewrites of a program
//! expose one subexpression as a hole, and whether a candidate passes its
//! properties (by compiling a check source into a runnable artifact). The
//! `ReferenceOracle` answers all of them with the in-crate type checker and
//! lazy interpreter.

pub mod eval;
pub mod holefit;
pub mod oracle;
pub mod propcheck;
pub mod reference;
pub mod typecheck;

pub use oracle::{CompilerOracle, FitResponse, HoleyExpr, OracleConfig, OracleError, Refinement};
pub use reference::ReferenceOracle;
pub use typecheck::{HoleInfo, TypeEnv, TypeError};
