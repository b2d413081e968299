//! share-throughput: compare lock-free and locked stack throughput.
//!
//! # Usage
//!
//! ```bash
//! share-throughput --pushers 2 --poppers 2 --prefill 100000 --seconds 10
//! share-throughput --implementation lock-free --json
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level); results go to stdout.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use share_stress::{
    compare_stacks, get_or_generate_seed, measure_stack, StressError, ThroughputConfig,
    ThroughputReport,
};
use share_structures::{LockFreeStack, LockedStack};

/// Maximum run length per implementation (seconds).
const SECONDS_MAX: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Implementation {
    All,
    LockFree,
    Locked,
}

/// Measure push/pop throughput of the stack implementations.
#[derive(Parser, Debug)]
#[command(name = "share-throughput")]
#[command(about = "Timed push/pop throughput for the shared stacks")]
struct Cli {
    /// Threads pushing in a tight loop.
    #[arg(long, default_value_t = 2)]
    pushers: usize,

    /// Threads popping in a tight loop.
    #[arg(long, default_value_t = 2)]
    poppers: usize,

    /// Values pushed before timing starts.
    #[arg(long, default_value_t = 100_000)]
    prefill: usize,

    /// Run length per implementation in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Which stack to measure.
    #[arg(long, value_enum, default_value_t = Implementation::All)]
    implementation: Implementation,

    /// Print results as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Seed for prefill and pusher values (STRESS_SEED or random if unset).
    #[arg(long)]
    seed: Option<u64>,
}

fn run(cli: &Cli) -> Result<Vec<ThroughputReport>, StressError> {
    let config = ThroughputConfig {
        pushers: cli.pushers,
        poppers: cli.poppers,
        prefill: cli.prefill,
        duration: Duration::from_secs(cli.seconds.min(SECONDS_MAX)),
        seed: cli.seed.unwrap_or_else(get_or_generate_seed),
    };

    match cli.implementation {
        Implementation::All => compare_stacks(&config),
        Implementation::LockFree => Ok(vec![measure_stack(Arc::new(LockFreeStack::new()), &config)?]),
        Implementation::Locked => Ok(vec![measure_stack(Arc::new(LockedStack::new()), &config)?]),
    }
}

fn print_table(reports: &[ThroughputReport]) {
    println!(
        "{:<12} {:>8} {:>8} {:>14} {:>10} {:>14}",
        "stack", "pushers", "poppers", "operations", "ms", "ops/sec"
    );
    for r in reports {
        println!(
            "{:<12} {:>8} {:>8} {:>14} {:>10} {:>14.0}",
            r.implementation, r.pushers, r.poppers, r.operations, r.elapsed_ms, r.ops_per_sec
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let reports = match run(&cli) {
        Ok(reports) => reports,
        Err(e) => {
            error!(error = %e, "throughput run failed");
            process::exit(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                error!(error = %e, "failed to serialize results");
                process::exit(1);
            }
        }
    } else {
        print_table(&reports);
    }
}
