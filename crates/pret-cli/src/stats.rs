//! # Stats and Root Subcommands
//!
//! Read-only views over an event log: the global counters with the
//! caller-side compliance percentage, and the committed map root. Both
//! rebuild the map from the logged records, so a log whose reported roots
//! do not match its records is refused.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use pret_client::ComplianceReport;
use pret_core::Digest;
use pret_state::{QueryService, RegistryAggregate, TransitionEvent};
use serde::Serialize;

use crate::replay::{replay_events, ReplaySummary};
use crate::{format_timestamp, load_events, print_json};

/// Arguments for the `pret stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Path to the JSON-lines event log.
    #[arg(value_name = "EVENTS_JSONL")]
    pub events: PathBuf,
}

/// Arguments for the `pret root` subcommand.
#[derive(Args, Debug)]
pub struct RootArgs {
    /// Path to the JSON-lines event log.
    #[arg(value_name = "EVENTS_JSONL")]
    pub events: PathBuf,
}

/// Output of `pret stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    #[serde(flatten)]
    pub report: ComplianceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_verification_at: Option<String>,
    pub registry: RegistryAggregate,
}

fn verified_replay(events: &[TransitionEvent]) -> Result<ReplaySummary> {
    replay_events(events).context("event log does not replay")
}

/// The map root recomputed from the records in `events`.
pub fn recomputed_root(events: &[TransitionEvent]) -> Result<Digest> {
    Ok(verified_replay(events)?.map_root)
}

/// Compute the stats output for an event log.
pub fn stats_of(events: &[TransitionEvent]) -> Result<StatsOutput> {
    let aggregate = verified_replay(events)?.aggregate;
    let query = QueryService::new(&aggregate);
    let stats = query.global_compliance_stats();
    Ok(StatsOutput {
        report: ComplianceReport::from(stats),
        last_verification_at: format_timestamp(stats.last_verification_time),
        registry: query.registry_info(),
    })
}

/// Execute the stats subcommand.
pub fn run_stats(args: &StatsArgs) -> Result<u8> {
    let events = load_events(&args.events)?;
    print_json(&stats_of(&events)?)?;
    Ok(0)
}

/// Execute the root subcommand. Prints the hex root only.
pub fn run_root(args: &RootArgs) -> Result<u8> {
    let events = load_events(&args.events)?;
    println!("{}", recomputed_root(&events)?);
    Ok(0)
}
