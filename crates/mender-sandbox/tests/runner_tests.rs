//! Integration tests for the process-backed check runner.
//!
//! These spawn real child processes through `/bin/sh` to exercise exit-code
//! classification, bitvector parsing, timeout kill/reap, and spawn failure.

use std::time::{Duration, Instant};

use mender_sandbox::{CheckCommand, CheckRunner, CompiledCheck, SandboxConfig, Verdict};

fn sh(script: &str) -> CompiledCheck {
    CompiledCheck::Driver(CheckCommand {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    })
}

fn runner_with_budget(micros: u64) -> CheckRunner {
    CheckRunner::new(SandboxConfig {
        budget_micros: micros,
    })
}

#[test]
fn test_clean_exit_is_all_pass() {
    let runner = CheckRunner::new(SandboxConfig::default());
    assert_eq!(runner.run(&sh("echo 11; exit 0")), Verdict::AllPass);
    assert_eq!(runner.run(&sh("exit 0")), Verdict::AllPass);
}

#[test]
fn test_partial_bitvector() {
    let runner = CheckRunner::new(SandboxConfig::default());
    assert_eq!(
        runner.run(&sh("echo 101; exit 1")),
        Verdict::Partial(vec![true, false, true])
    );
}

#[test]
fn test_abnormal_exit_is_all_fail() {
    let runner = CheckRunner::new(SandboxConfig::default());
    assert_eq!(runner.run(&sh("exit 7")), Verdict::AllFail);
    // Killed by signal: no exit status, no bits.
    assert_eq!(runner.run(&sh("kill -9 $$")), Verdict::AllFail);
}

#[test]
fn test_contract_breach_is_wrong_shape() {
    let runner = CheckRunner::new(SandboxConfig::default());
    // Exit 0 promising success while printing a failing bitvector.
    assert_eq!(runner.run(&sh("echo 01; exit 0")), Verdict::WrongShape);
}

#[test]
fn test_timeout_kills_within_budget() {
    let runner = runner_with_budget(200_000);
    let start = Instant::now();
    let verdict = runner.run(&sh("sleep 30"));
    let elapsed = start.elapsed();
    assert_eq!(verdict, Verdict::Timeout);
    // Killed promptly, nowhere near the sleep duration.
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
}

#[test]
fn test_unspawnable_driver_is_all_fail() {
    let runner = CheckRunner::new(SandboxConfig::default());
    let check = CompiledCheck::Driver(CheckCommand {
        program: "/nonexistent/mender-check-driver".to_string(),
        args: vec![],
    });
    assert_eq!(runner.run(&check), Verdict::AllFail);
}

#[test]
fn test_batch_preserves_order() {
    let runner = CheckRunner::new(SandboxConfig::default());
    let checks = vec![
        sh("exit 0"),
        sh("echo 10; exit 1"),
        sh("exit 3"),
    ];
    let verdicts = runner.run_all(&checks);
    assert_eq!(
        verdicts,
        vec![
            Verdict::AllPass,
            Verdict::Partial(vec![true, false]),
            Verdict::AllFail,
        ]
    );
}

#[test]
fn test_check_determinism() {
    // Same compiled check, repeated runs, same verdict.
    let runner = CheckRunner::new(SandboxConfig::default());
    let check = sh("echo 100; exit 1");
    let first = runner.run(&check);
    for _ in 0..5 {
        assert_eq!(runner.run(&check), first);
    }
}
