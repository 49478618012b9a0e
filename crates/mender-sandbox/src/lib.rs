//! Sandboxed execution of property checks.
//!
//! Candidate repairs are not trusted code: they may diverge, crash, or
//! return the wrong shape entirely. This crate owns the tri-valued-plus
//! verdict type, the check runner that executes compiled checks under a
//! wall-clock budget, and the builder that renders per-candidate check
//! sources.

pub mod check;
pub mod config;
pub mod runner;

pub use check::{build_check_source, build_check_sources, CheckSource, CANDIDATE_NAME};
pub use config::SandboxConfig;
pub use runner::{CheckCommand, CheckRunner, CheckThunk, CompiledCheck, ThunkOutcome, Verdict};
