//! `mender` — property-driven program repair from the command line.
//!
//! Loads a problem file (a typed `target` binding, `prop_*` properties,
//! context bindings), runs the repair search, and prints the winning
//! fixes. Exit code 0 on normal completion whether or not repairs were
//! found; 2 on configuration or input errors.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mender_core::{RepairConfig, RepairSession, SessionError};
use mender_oracle::ReferenceOracle;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mender",
    version,
    about = "Property-driven repair for a small lazy functional language"
)]
struct Cli {
    /// Problem file: a typed `target`, `prop_*` properties, context.
    file: PathBuf,

    /// Top-level hole nesting level for synthesis.
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    holes: i64,

    /// Recursion depth for synthesis.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    depth: i64,

    /// Seed for every stochastic component.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Maximum generations of the genetic search.
    #[arg(long)]
    iterations: Option<u64>,

    /// Population size (even, at least 2).
    #[arg(long)]
    population: Option<usize>,

    /// Wall-clock budget in minutes, checked between generations.
    #[arg(long = "timeout-mins")]
    timeout_mins: Option<u64>,

    /// Single-step repair instead of the genetic search.
    #[arg(long = "no-search")]
    no_search: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Verbose search tracing.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mender: {e}");
            ExitCode::from(2)
        }
    }
}

fn config_from(cli: &Cli) -> RepairConfig {
    let mut config = RepairConfig {
        holes: cli.holes,
        depth: cli.depth,
        debug: cli.debug,
        seed: cli.seed,
        ..RepairConfig::default()
    };
    if let Some(iterations) = cli.iterations {
        config.genetic.iterations = iterations;
    }
    if let Some(population) = cli.population {
        config.genetic.population_size = population;
    }
    if let Some(timeout) = cli.timeout_mins {
        config.genetic.timeout_minutes = timeout;
    }
    config
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(&cli.file)
        .map_err(|e| format!("cannot read {}: {e}", cli.file.display()))?;
    let oracle = ReferenceOracle::new();
    let session = RepairSession::load(&oracle, &source, config_from(cli))?;

    if cli.no_search {
        match session.repair() {
            Ok(fixed) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&fixed)?);
                } else if fixed.is_empty() {
                    println!("no repairs found");
                } else {
                    println!("{} repaired program(s):", fixed.len());
                    for program in &fixed {
                        println!("  {program}");
                    }
                }
            }
            Err(e) => report_search_outcome(e)?,
        }
        return Ok(());
    }

    match session.evolve() {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.fixes.is_empty() {
                println!(
                    "no repairs found after {} generation(s) ({} ms)",
                    report.generations, report.elapsed_ms
                );
            } else {
                println!(
                    "{} fix(es) after {} generation(s) ({} ms):",
                    report.fixes.len(),
                    report.generations,
                    report.elapsed_ms
                );
                for fix in &report.fixes {
                    for edit in &fix.edits {
                        println!("  {} => {}", edit.site, edit.replacement);
                    }
                    println!("  repaired: {}", fix.repaired);
                    println!();
                }
            }
        }
        Err(e) => report_search_outcome(e)?,
    }
    Ok(())
}

/// A search that gives up is still a normal completion (exit 0); only
/// configuration and input errors change the exit code.
fn report_search_outcome(e: SessionError) -> Result<(), Box<dyn std::error::Error>> {
    match e {
        SessionError::Search(inner) => {
            eprintln!("mender: search gave up: {inner}");
            Ok(())
        }
        other => Err(Box::new(other)),
    }
}
