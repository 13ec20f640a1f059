//! # pret CLI entry point
//!
//! Parses command-line arguments, initializes tracing, and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pret_cli::replay::{run_replay, ReplayArgs};
use pret_cli::simulate::{run_simulate, SimulateArgs};
use pret_cli::stats::{run_root, run_stats, RootArgs, StatsArgs};

/// PRET compliance registry CLI
///
/// Simulates proof-gated submissions against an in-process registry and
/// inspects accepted-event logs.
#[derive(Parser, Debug)]
#[command(name = "pret", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to the client configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scenario through the mock prover, pipeline, and in-process ledger.
    Simulate(SimulateArgs),

    /// Rebuild mirror and aggregate from an event log and verify the root chain.
    Replay(ReplayArgs),

    /// Print global compliance counters and percentage for an event log.
    Stats(StatsArgs),

    /// Print the map root an event log commits to.
    Root(RootArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "pret CLI starting");

    let result = match cli.command {
        Commands::Simulate(args) => {
            pret_cli::load_config(cli.config.as_deref()).and_then(|config| run_simulate(&args, &config))
        }
        Commands::Replay(args) => run_replay(&args),
        Commands::Stats(args) => run_stats(&args),
        Commands::Root(args) => run_root(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
