//! The check runner — executes a compiled check under a wall-clock budget
//! and classifies the outcome.
//!
//! Two artifact shapes flow through the same classification: standalone
//! test drivers (spawned as child processes, killed on budget exhaustion)
//! and in-memory thunks from interpreter-backed oracles (run on a watchdog
//! thread with a fuel-bounded evaluator). The binary contract for drivers:
//! print the property bitvector as a line of `0`/`1` characters and exit 0
//! iff every bit is 1.
//!
//! The runner never propagates errors upward; every unexpected outcome
//! classifies as a verdict.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::config::SandboxConfig;

/// Stack reservation for check watchdog threads.
const THUNK_STACK_BYTES: usize = 256 * 1024 * 1024;

/// Outcome of running a candidate's checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Every property returned true.
    AllPass,
    /// The check crashed, exited abnormally, or could not be run.
    AllFail,
    /// Per-property results, in property order.
    Partial(Vec<bool>),
    /// The wall-clock budget was exhausted; the check was killed.
    Timeout,
    /// The compiled artifact did not have the expected dynamic shape.
    WrongShape,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::AllPass)
    }
}

/// A spawnable test driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Result of evaluating an in-memory check thunk to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThunkOutcome {
    /// Per-property success bits, in property order.
    Bits(Vec<bool>),
    /// The evaluator detected non-termination (fuel exhausted or a value
    /// demanded itself).
    NonTermination,
    /// Evaluation failed.
    Crashed(String),
    /// The check did not produce a boolean vector.
    WrongShape,
}

/// An in-memory compiled check. Implementations must bound their own
/// evaluation (the runner's budget only abandons the watchdog thread).
pub trait CheckThunk: Send + Sync {
    fn eval(&self) -> ThunkOutcome;
}

/// A compiled check, as produced by a compiler oracle.
#[derive(Clone)]
pub enum CompiledCheck {
    /// An external test-driver executable.
    Driver(CheckCommand),
    /// An in-memory thunk from an interpreter-backed oracle.
    Thunk(Arc<dyn CheckThunk>),
}

impl std::fmt::Debug for CompiledCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompiledCheck::Driver(cmd) => f.debug_tuple("Driver").field(cmd).finish(),
            CompiledCheck::Thunk(_) => f.debug_tuple("Thunk").field(&"<thunk>").finish(),
        }
    }
}

/// Executes compiled checks under the configured budget.
pub struct CheckRunner {
    config: SandboxConfig,
}

impl CheckRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run one check. Infallible: failures classify as verdicts.
    pub fn run(&self, check: &CompiledCheck) -> Verdict {
        match check {
            CompiledCheck::Driver(cmd) => self.run_driver(cmd),
            CompiledCheck::Thunk(thunk) => self.run_thunk(thunk),
        }
    }

    /// Run a batch of checks, preserving input order in the output.
    pub fn run_all(&self, checks: &[CompiledCheck]) -> Vec<Verdict> {
        checks.iter().map(|c| self.run(c)).collect()
    }

    fn run_driver(&self, cmd: &CheckCommand) -> Verdict {
        let mut child = match Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(program = %cmd.program, error = %e, "check driver failed to spawn");
                return Verdict::AllFail;
            }
        };

        match child.wait_timeout(self.config.budget()) {
            Ok(Some(status)) => {
                let mut out = String::new();
                if let Some(mut stdout) = child.stdout.take() {
                    let _ = stdout.read_to_string(&mut out);
                }
                classify_exit(status.success(), &out)
            }
            Ok(None) => {
                // Budget exhausted: hard-kill and reap so no child leaks.
                let _ = child.kill();
                let _ = child.wait();
                Verdict::Timeout
            }
            Err(e) => {
                debug!(program = %cmd.program, error = %e, "wait on check driver failed");
                let _ = child.kill();
                let _ = child.wait();
                Verdict::AllFail
            }
        }
    }

    fn run_thunk(&self, thunk: &Arc<dyn CheckThunk>) -> Verdict {
        let (tx, rx) = mpsc::channel();
        let task = Arc::clone(thunk);
        // Deeply recursive candidates can exhaust a default thread stack
        // before their fuel; reserve a large one for the watchdog.
        let spawned = thread::Builder::new()
            .name("mender-check".to_string())
            .stack_size(THUNK_STACK_BYTES)
            .spawn(move || {
                let _ = tx.send(task.eval());
            });
        if let Err(e) = spawned {
            debug!(error = %e, "check watchdog thread failed to spawn");
            return Verdict::AllFail;
        }
        match rx.recv_timeout(self.config.budget()) {
            Ok(ThunkOutcome::Bits(bits)) => {
                if bits.iter().all(|&b| b) {
                    Verdict::AllPass
                } else {
                    Verdict::Partial(bits)
                }
            }
            Ok(ThunkOutcome::NonTermination) => Verdict::Timeout,
            Ok(ThunkOutcome::Crashed(msg)) => {
                debug!(error = %msg, "check thunk crashed");
                Verdict::AllFail
            }
            Ok(ThunkOutcome::WrongShape) => Verdict::WrongShape,
            // Budget exhausted; the thread is abandoned and bounded by the
            // thunk's own fuel.
            Err(mpsc::RecvTimeoutError::Timeout) => Verdict::Timeout,
            // The watchdog thread panicked.
            Err(mpsc::RecvTimeoutError::Disconnected) => Verdict::AllFail,
        }
    }
}

/// Parse the first non-empty stdout line as a `0`/`1` bitvector.
fn parse_bits(out: &str) -> Option<Vec<bool>> {
    let line = out.lines().find(|l| !l.trim().is_empty())?.trim();
    if line.is_empty() || !line.chars().all(|c| c == '0' || c == '1') {
        return None;
    }
    Some(line.chars().map(|c| c == '1').collect())
}

fn classify_exit(success: bool, out: &str) -> Verdict {
    let bits = parse_bits(out);
    if success {
        // Exit 0 promises an all-true vector; a contradicting one means the
        // artifact does not follow the binary contract.
        match bits {
            Some(bits) if !bits.iter().all(|&b| b) => Verdict::WrongShape,
            _ => Verdict::AllPass,
        }
    } else {
        match bits {
            Some(bits) => Verdict::Partial(bits),
            None => Verdict::AllFail,
        }
    }
}
